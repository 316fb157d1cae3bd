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

//! Output devices and the selector drivers use to locate them.

use crate::context::Context;
use crate::packet::PacketFrame;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::Arc;

/// A device a driver acts on, addressed by protocol and device address.
#[async_trait]
pub trait OutputDevice: Send + Sync {
    fn proto(&self) -> &str;

    fn address(&self) -> &str;

    /// Sends `frame` to the device and returns its reply.
    async fn process(&self, frame: PacketFrame, ctx: &Context) -> io::Result<PacketFrame>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectCriteria {
    pub proto: String,
    pub address: Option<String>,
}

impl SelectCriteria {
    pub fn proto(proto: &str) -> Self {
        Self {
            proto: proto.to_string(),
            address: None,
        }
    }

    pub fn device(proto: &str, address: &str) -> Self {
        Self {
            proto: proto.to_string(),
            address: Some(address.to_string()),
        }
    }
}

impl Display for SelectCriteria {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.address {
            Some(address) => write!(f, "{}@{}", self.proto, address),
            None => write!(f, "{}", self.proto),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectError {
    NotFound(SelectCriteria),
}

impl Display for SelectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectError::NotFound(criteria) => write!(f, "no device matches '{criteria}'"),
        }
    }
}

impl Error for SelectError {}

/// Opaque capability handed to drivers at handle time.
pub trait PipelineSelector: Send + Sync {
    fn select(&self, criteria: &SelectCriteria) -> Result<Arc<dyn OutputDevice>, SelectError>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuplicateDeviceError {
    pub proto: String,
    pub address: String,
}

impl Display for DuplicateDeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "output device {}@{} is already registered",
            self.proto, self.address
        )
    }
}

impl Error for DuplicateDeviceError {}

/// Output devices grouped by protocol, in registration order.
#[derive(Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<String, Vec<Arc<dyn OutputDevice>>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, device: Arc<dyn OutputDevice>) -> Result<(), DuplicateDeviceError> {
        let pipeline = self.pipelines.entry(device.proto().to_string()).or_default();
        if pipeline
            .iter()
            .any(|existing| existing.address() == device.address())
        {
            return Err(DuplicateDeviceError {
                proto: device.proto().to_string(),
                address: device.address().to_string(),
            });
        }
        pipeline.push(device);
        Ok(())
    }

    pub fn device_count(&self) -> usize {
        self.pipelines.values().map(Vec::len).sum()
    }
}

impl PipelineSelector for PipelineRegistry {
    /// Without an address the first device registered for the protocol is chosen.
    fn select(&self, criteria: &SelectCriteria) -> Result<Arc<dyn OutputDevice>, SelectError> {
        let found = self
            .pipelines
            .get(&criteria.proto)
            .and_then(|pipeline| match &criteria.address {
                Some(address) => pipeline
                    .iter()
                    .find(|device| device.address() == address.as_str()),
                None => pipeline.first(),
            });

        found
            .cloned()
            .ok_or_else(|| SelectError::NotFound(criteria.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        OutputDevice, PipelineRegistry, PipelineSelector, SelectCriteria, SelectError,
    };
    use crate::context::Context;
    use crate::packet::PacketFrame;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Arc;

    struct EchoDevice {
        proto: &'static str,
        address: &'static str,
    }

    #[async_trait]
    impl OutputDevice for EchoDevice {
        fn proto(&self) -> &str {
            self.proto
        }

        fn address(&self) -> &str {
            self.address
        }

        async fn process(&self, frame: PacketFrame, _ctx: &Context) -> io::Result<PacketFrame> {
            Ok(frame)
        }
    }

    fn registry() -> PipelineRegistry {
        let mut registry = PipelineRegistry::new();
        for (proto, address) in [("wiegand", "10.0.0.1:6000"), ("wiegand", "10.0.0.2:6000")] {
            registry
                .register(Arc::new(EchoDevice { proto, address }))
                .expect("unique device");
        }
        registry
    }

    #[test]
    fn select_by_address_picks_that_device() {
        let device = registry()
            .select(&SelectCriteria::device("wiegand", "10.0.0.2:6000"))
            .expect("device");

        assert_eq!(device.address(), "10.0.0.2:6000");
    }

    #[test]
    fn select_by_proto_picks_first_registered() {
        let device = registry()
            .select(&SelectCriteria::proto("wiegand"))
            .expect("device");

        assert_eq!(device.address(), "10.0.0.1:6000");
    }

    #[test]
    fn select_reports_not_found() {
        let criteria = SelectCriteria::device("modbus", "10.0.0.9:502");

        assert_eq!(
            registry().select(&criteria).err(),
            Some(SelectError::NotFound(criteria))
        );
    }

    #[test]
    fn duplicate_devices_are_rejected() {
        let mut registry = registry();

        let err = registry
            .register(Arc::new(EchoDevice {
                proto: "wiegand",
                address: "10.0.0.1:6000",
            }))
            .unwrap_err();

        assert_eq!(err.address, "10.0.0.1:6000");
        assert_eq!(registry.device_count(), 2);
    }
}
