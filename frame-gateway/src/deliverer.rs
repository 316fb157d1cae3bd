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

//! The only way an input device enters the dispatch core.

use crate::packet::PacketFrame;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Publish rejected by the dispatch core.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeliverError {
    /// The gateway is not started or is shutting down.
    NotAccepting,
    InvalidTopic(String),
}

impl Display for DeliverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliverError::NotAccepting => write!(f, "gateway is not accepting publishes"),
            DeliverError::InvalidTopic(topic) => write!(f, "topic '{topic}' cannot be published"),
        }
    }
}

impl Error for DeliverError {}

/// Boundary capability handed to input devices. Devices never see the interceptor
/// chain or routing tables directly.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver_publish(&self, topic: &str, frame: PacketFrame) -> Result<(), DeliverError>;
}
