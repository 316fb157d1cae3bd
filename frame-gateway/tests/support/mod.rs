use async_trait::async_trait;
use frame_gateway::{
    BundleConfig, Context, DeviceAddress, Driver, DriverCore, HandlerError, Lifecycle, Named,
    PipelineSelector, SelectCriteria, Session, TopicFilter, TopicFiltered, UdpInputDevice,
};
use integration_test_utils::ScriptedListener;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn config(value: Value) -> BundleConfig {
    BundleConfig::from_value(value).expect("object config")
}

/// A device that was initialised and started with `options`.
#[allow(dead_code)]
pub(crate) fn started_scripted_device(
    listener: &ScriptedListener,
    options: Value,
) -> UdpInputDevice {
    let ctx = Context::new("it");
    let mut device = UdpInputDevice::with_listener(
        "scripted",
        DeviceAddress::new("127.0.0.1", "9000"),
        Arc::new(listener.clone()),
    );
    device
        .on_init(&config(options), &ctx)
        .expect("init should succeed");
    device.on_start(&ctx).expect("start should succeed");
    device
}

/// Polls `condition` every few milliseconds until it holds or `timeout` passes.
pub(crate) async fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Forwards every matching request to the first output device of `proto`.
#[allow(dead_code)]
pub(crate) struct ForwardingDriver {
    core: DriverCore,
    proto: String,
}

#[allow(dead_code)]
impl ForwardingDriver {
    pub(crate) fn new(name: &str, proto: &str) -> Self {
        Self {
            core: DriverCore::new(name),
            proto: proto.to_string(),
        }
    }
}

impl Named for ForwardingDriver {
    fn name(&self) -> &str {
        self.core.name()
    }
}

impl TopicFiltered for ForwardingDriver {
    fn topic_filter(&self) -> &TopicFilter {
        self.core.topic_filter()
    }
}

impl Lifecycle for ForwardingDriver {
    fn on_init(
        &mut self,
        config: &BundleConfig,
        _ctx: &Context,
    ) -> Result<(), frame_gateway::ConfigError> {
        self.core.init_topics(config)
    }

    fn on_start(&mut self, _ctx: &Context) -> Result<(), frame_gateway::ConfigError> {
        Ok(())
    }

    fn on_stop(&self, _ctx: &Context) {}
}

#[async_trait]
impl Driver for ForwardingDriver {
    async fn handle(
        &self,
        session: &mut Session,
        selector: &dyn PipelineSelector,
        ctx: &Context,
    ) -> Result<(), HandlerError> {
        let device = selector.select(&SelectCriteria::proto(&self.proto))?;
        let reply = device
            .process(session.inbound().payload().clone(), ctx)
            .await
            .map_err(|source| HandlerError::Device {
                address: device.address().to_string(),
                source,
            })?;
        session.outbound_mut().frame = Some(reply);
        Ok(())
    }
}
