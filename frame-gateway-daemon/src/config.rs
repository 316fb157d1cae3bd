/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use frame_gateway::deserialize_duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) gateway: GatewayConfig,
    #[serde(default)]
    pub(crate) udp_devices: Vec<UdpDeviceConfig>,
    #[serde(default)]
    pub(crate) interceptors: Vec<InterceptorConfig>,
    #[serde(default)]
    pub(crate) drivers: Vec<DriverConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub(crate) name: String,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration",
        skip_serializing
    )]
    pub(crate) shutdown_timeout: Duration,
}

fn default_shutdown_timeout() -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct UdpDeviceConfig {
    pub(crate) name: String,
    pub(crate) group_address: String,
    pub(crate) private_address: String,
    #[serde(default)]
    pub(crate) args: Value,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterceptorKind {
    Drop,
    MaxPayload,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct InterceptorConfig {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) priority: i32,
    #[serde(default)]
    pub(crate) topics: Vec<String>,
    pub(crate) kind: InterceptorKind,
    #[serde(default)]
    pub(crate) args: Value,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Log,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    pub(crate) name: String,
    pub(crate) kind: DriverKind,
    #[serde(default)]
    pub(crate) args: Value,
}
