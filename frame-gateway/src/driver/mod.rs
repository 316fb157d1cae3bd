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

//! Drivers: bundles that act on selected output devices for matching inbound requests.

mod pipeline;
pub use pipeline::{
    DuplicateDeviceError, OutputDevice, PipelineRegistry, PipelineSelector, SelectCriteria,
    SelectError,
};

use crate::bundle::{Lifecycle, Named, TopicFiltered};
use crate::config::{BundleConfig, ConfigError};
use crate::context::Context;
use crate::packet::{Attributes, MessagePacket, PacketFrame};
use crate::topic_expr::TopicFilter;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::time::{Duration, Instant};

/// Protocol-level failure inside [`Driver::handle`]. Reported to the caller, never fatal
/// to the gateway.
#[derive(Debug)]
pub enum HandlerError {
    Select(SelectError),
    Device { address: String, source: io::Error },
    Protocol(String),
}

impl Display for HandlerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Select(err) => write!(f, "device selection failed: {err}"),
            HandlerError::Device { address, source } => {
                write!(f, "device {address} failed: {source}")
            }
            HandlerError::Protocol(reason) => write!(f, "protocol error: {reason}"),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Select(err) => Some(err),
            HandlerError::Device { source, .. } => Some(source),
            HandlerError::Protocol(_) => None,
        }
    }
}

impl From<SelectError> for HandlerError {
    fn from(err: SelectError) -> Self {
        HandlerError::Select(err)
    }
}

/// Response a driver writes back for one request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outbound {
    pub attributes: Attributes,
    pub frame: Option<PacketFrame>,
}

/// One inbound request as seen by a driver.
#[derive(Debug)]
pub struct Session {
    inbound: MessagePacket,
    received_at: Instant,
    outbound: Outbound,
}

impl Session {
    pub fn new(inbound: MessagePacket) -> Self {
        Self {
            inbound,
            received_at: Instant::now(),
            outbound: Outbound::default(),
        }
    }

    pub fn inbound(&self) -> &MessagePacket {
        &self.inbound
    }

    pub fn topic(&self) -> &str {
        self.inbound.topic()
    }

    pub fn correlation_id(&self) -> &str {
        self.inbound.correlation_id()
    }

    pub fn since_received(&self) -> Duration {
        self.received_at.elapsed()
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn outbound_mut(&mut self) -> &mut Outbound {
        &mut self.outbound
    }

    pub fn into_outbound(self) -> Outbound {
        self.outbound
    }
}

#[async_trait]
pub trait Driver: Lifecycle + Named + TopicFiltered {
    async fn handle(
        &self,
        session: &mut Session,
        selector: &dyn PipelineSelector,
        ctx: &Context,
    ) -> Result<(), HandlerError>;
}

/// Name and topic filter shared by driver implementations. The filter comes from the
/// `topics` option at `on_init`.
#[derive(Clone, Debug)]
pub struct DriverCore {
    name: String,
    topic_filter: TopicFilter,
}

impl DriverCore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            topic_filter: TopicFilter::all(),
        }
    }

    pub fn init_topics(&mut self, config: &BundleConfig) -> Result<(), ConfigError> {
        self.topic_filter = config.topic_filter()?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic_filter(&self) -> &TopicFilter {
        &self.topic_filter
    }
}

#[cfg(test)]
mod tests {
    use super::{DriverCore, HandlerError, SelectCriteria, SelectError, Session};
    use crate::config::BundleConfig;
    use crate::packet::{MessagePacket, PacketFrame};
    use crate::topic_expr::TopicMatcher;
    use serde_json::json;
    use std::error::Error;

    #[test]
    fn driver_core_reads_topics_at_init() {
        let mut core = DriverCore::new("relay");
        assert!(core.topic_filter().matches("anything"));

        let config = BundleConfig::from_value(json!({ "topics": ["gate/+/open"] })).unwrap();
        core.init_topics(&config).unwrap();

        assert!(core.topic_filter().matches("gate/3/open"));
        assert!(!core.topic_filter().matches("gate/3/close"));
    }

    #[test]
    fn session_collects_the_outbound_response() {
        let mut session = Session::new(MessagePacket::with_correlation_id(
            "gate/3/open",
            "c-9",
            vec![0x01],
        ));
        session.outbound_mut().attributes.insert("status", "ok");
        session.outbound_mut().frame = Some(PacketFrame::from(vec![0xAA]));

        assert_eq!(session.correlation_id(), "c-9");
        let outbound = session.into_outbound();
        assert_eq!(outbound.attributes.get_str("status"), Some("ok"));
        assert_eq!(outbound.frame.as_deref(), Some(&[0xAAu8][..]));
    }

    #[test]
    fn handler_error_keeps_selection_cause() {
        let err = HandlerError::from(SelectError::NotFound(SelectCriteria::proto("modbus")));

        assert!(err.source().is_some());
        assert!(err.to_string().contains("modbus"));
    }
}
