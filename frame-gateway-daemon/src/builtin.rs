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

//! Interceptors and drivers selectable from the daemon configuration.

use async_trait::async_trait;
use frame_gateway::{
    BundleConfig, ConfigError, Context, Driver, DriverCore, HandlerError, Intercept,
    Interceptor, InterceptorMeta, Lifecycle, MessagePacket, Named, PipelineSelector, Session,
    TopicFilter, TopicFiltered,
};
use serde::Deserialize;
use tracing::{debug, info};

pub(crate) const PAYLOAD_LEN_ATTRIBUTE: &str = "payload_len";

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct MaxPayloadArgs {
    max_bytes: usize,
}

/// Drops packets whose payload exceeds `max_bytes`.
#[derive(Debug)]
pub(crate) struct MaxPayloadInterceptor {
    meta: InterceptorMeta,
    max_bytes: usize,
}

impl MaxPayloadInterceptor {
    pub(crate) fn from_args(
        meta: InterceptorMeta,
        args: &BundleConfig,
    ) -> Result<Self, ConfigError> {
        let MaxPayloadArgs { max_bytes } = args.deserialize()?;
        Ok(Self { meta, max_bytes })
    }
}

impl Named for MaxPayloadInterceptor {
    fn name(&self) -> &str {
        self.meta.name()
    }
}

impl TopicFiltered for MaxPayloadInterceptor {
    fn topic_filter(&self) -> &TopicFilter {
        self.meta.topic_filter()
    }
}

#[async_trait]
impl Interceptor for MaxPayloadInterceptor {
    fn priority(&self) -> i32 {
        self.meta.priority()
    }

    async fn handle(&self, packet: &MessagePacket, _ctx: &Context) -> Intercept {
        if packet.payload().len() > self.max_bytes {
            debug!(
                interceptor = self.meta.name(),
                topic = packet.topic(),
                payload_len = packet.payload().len(),
                max_bytes = self.max_bytes,
                "payload over limit"
            );
            return Intercept::Drop;
        }
        Intercept::Next
    }
}

/// Logs every request it receives and reports the payload length back.
#[derive(Debug)]
pub(crate) struct LogDriver {
    core: DriverCore,
}

impl LogDriver {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            core: DriverCore::new(name),
        }
    }
}

impl Named for LogDriver {
    fn name(&self) -> &str {
        self.core.name()
    }
}

impl TopicFiltered for LogDriver {
    fn topic_filter(&self) -> &TopicFilter {
        self.core.topic_filter()
    }
}

impl Lifecycle for LogDriver {
    fn on_init(&mut self, config: &BundleConfig, _ctx: &Context) -> Result<(), ConfigError> {
        self.core.init_topics(config)
    }

    fn on_start(&mut self, _ctx: &Context) -> Result<(), ConfigError> {
        Ok(())
    }

    fn on_stop(&self, _ctx: &Context) {}
}

#[async_trait]
impl Driver for LogDriver {
    async fn handle(
        &self,
        session: &mut Session,
        _selector: &dyn PipelineSelector,
        ctx: &Context,
    ) -> Result<(), HandlerError> {
        let payload_len = session.inbound().payload().len();
        info!(
            gateway = ctx.gateway_name(),
            driver = self.core.name(),
            topic = session.topic(),
            correlation_id = session.correlation_id(),
            payload_len,
            "packet received"
        );
        session
            .outbound_mut()
            .attributes
            .insert(PAYLOAD_LEN_ATTRIBUTE, payload_len);
        Ok(())
    }
}
