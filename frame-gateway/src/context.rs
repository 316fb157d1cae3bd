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

use crate::packet::Attributes;
use std::sync::Arc;

/// Gateway-scoped context handed to every bundle, interceptor and driver call.
///
/// Cloning is cheap; the shared attributes are read-only once the gateway is built.
#[derive(Clone, Debug)]
pub struct Context {
    gateway_name: Arc<str>,
    shared: Arc<Attributes>,
}

impl Context {
    pub fn new(gateway_name: &str) -> Self {
        Self::with_shared(gateway_name, Attributes::new())
    }

    pub fn with_shared(gateway_name: &str, shared: Attributes) -> Self {
        Self {
            gateway_name: Arc::from(gateway_name),
            shared: Arc::new(shared),
        }
    }

    pub fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    pub fn shared(&self) -> &Attributes {
        &self.shared
    }
}
