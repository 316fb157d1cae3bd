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

//! Gateway assembly and the dispatch core input devices publish into.
//!
//! A [`Gateway`] is mutable only while it is being assembled: interceptors, drivers
//! and devices are registered and initialised there. [`Gateway::start`] consumes it,
//! freezes the interceptor chain inside a shared [`Dispatcher`] and spawns one serve
//! thread per input device.

use crate::bundle::{BundleState, Lifecycle, LifecycleError, LifecycleTracker};
use crate::config::{BundleConfig, ConfigError};
use crate::context::Context;
use crate::deliverer::{DeliverError, Deliverer};
use crate::driver::{Driver, HandlerError, Outbound, PipelineRegistry, PipelineSelector, Session};
use crate::input_device::{InputDevice, ServeError};
use crate::interceptor::{
    DuplicateNameError, Intercept, Interceptor, InterceptorChain, Outcome, RegisterError,
};
use crate::observability::{events, fields};
use crate::packet::{MessagePacket, PacketFrame};
use crate::runtime::device_runtime::{spawn_device_loop, DeviceLoopHandle};
use crate::topic_expr::{is_publishable_topic, PatternError, TopicMatcher};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "gateway";

/// Assembly or startup failure. All of these abort gateway startup.
#[derive(Debug)]
pub enum GatewayError {
    DuplicateName(DuplicateNameError),
    Pattern(PatternError),
    DuplicateBundle { name: String },
    Init { bundle: String, source: ConfigError },
    Start { bundle: String, source: ConfigError },
    Lifecycle { bundle: String, source: LifecycleError },
    Spawn { device: String, source: io::Error },
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::DuplicateName(err) => write!(f, "{err}"),
            GatewayError::Pattern(err) => write!(f, "{err}"),
            GatewayError::DuplicateBundle { name } => {
                write!(f, "bundle '{name}' is already registered")
            }
            GatewayError::Init { bundle, source } => {
                write!(f, "bundle '{bundle}' failed to initialise: {source}")
            }
            GatewayError::Start { bundle, source } => {
                write!(f, "bundle '{bundle}' failed to start: {source}")
            }
            GatewayError::Lifecycle { bundle, source } => {
                write!(f, "bundle '{bundle}': {source}")
            }
            GatewayError::Spawn { device, source } => {
                write!(f, "unable to run device '{device}': {source}")
            }
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GatewayError::DuplicateName(err) => Some(err),
            GatewayError::Pattern(err) => Some(err),
            GatewayError::DuplicateBundle { .. } => None,
            GatewayError::Init { source, .. } | GatewayError::Start { source, .. } => Some(source),
            GatewayError::Lifecycle { source, .. } => Some(source),
            GatewayError::Spawn { source, .. } => Some(source),
        }
    }
}

impl From<DuplicateNameError> for GatewayError {
    fn from(err: DuplicateNameError) -> Self {
        GatewayError::DuplicateName(err)
    }
}

impl From<RegisterError> for GatewayError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::Pattern(err) => GatewayError::Pattern(err),
            RegisterError::DuplicateName(err) => GatewayError::DuplicateName(err),
        }
    }
}

struct BundleSlot<B> {
    name: String,
    bundle: B,
    lifecycle: LifecycleTracker,
}

impl<B> BundleSlot<B> {
    fn advance(&mut self, to: BundleState) -> Result<(), GatewayError> {
        self.lifecycle
            .advance(to)
            .map_err(|source| GatewayError::Lifecycle {
                bundle: self.name.clone(),
                source,
            })
    }
}

/// A gateway under assembly.
pub struct Gateway {
    ctx: Context,
    chain: InterceptorChain,
    drivers: Vec<BundleSlot<Box<dyn Driver>>>,
    devices: Vec<BundleSlot<Box<dyn InputDevice>>>,
    selector: Arc<dyn PipelineSelector>,
}

impl Gateway {
    pub fn new(name: &str) -> Self {
        Self::with_context(Context::new(name))
    }

    pub fn with_context(ctx: Context) -> Self {
        Self {
            ctx,
            chain: InterceptorChain::new(),
            drivers: Vec::new(),
            devices: Vec::new(),
            selector: Arc::new(PipelineRegistry::new()),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn set_pipeline_selector(&mut self, selector: Arc<dyn PipelineSelector>) {
        self.selector = selector;
    }

    pub fn register_interceptor(
        &mut self,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<(), GatewayError> {
        Ok(self.chain.register(interceptor)?)
    }

    pub fn register_interceptor_fn<I, S, F>(
        &mut self,
        name: &str,
        priority: i32,
        topics: I,
        handler: F,
    ) -> Result<(), GatewayError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&MessagePacket, &Context) -> Intercept + Send + Sync + 'static,
    {
        Ok(self.chain.register_fn(name, priority, topics, handler)?)
    }

    pub fn interceptor_count(&self) -> usize {
        self.chain.len()
    }

    /// Registers a driver and runs its `on_init` with `config`.
    pub fn add_driver(
        &mut self,
        driver: Box<dyn Driver>,
        config: &BundleConfig,
    ) -> Result<(), GatewayError> {
        let name = driver.name().to_string();
        if self.drivers.iter().any(|slot| slot.name == name) {
            return Err(GatewayError::DuplicateBundle { name });
        }
        let slot = init_bundle(name, driver, config, &self.ctx, |driver, config, ctx| {
            driver.on_init(config, ctx)
        })?;
        self.drivers.push(slot);
        Ok(())
    }

    /// Registers an input device and runs its `on_init` with `config`.
    pub fn add_input_device(
        &mut self,
        device: Box<dyn InputDevice>,
        config: &BundleConfig,
    ) -> Result<(), GatewayError> {
        let name = device.name().to_string();
        if self.devices.iter().any(|slot| slot.name == name) {
            return Err(GatewayError::DuplicateBundle { name });
        }
        let slot = init_bundle(name, device, config, &self.ctx, |device, config, ctx| {
            device.on_init(config, ctx)
        })?;
        self.devices.push(slot);
        Ok(())
    }

    /// Starts drivers, then devices, then one serve loop per device.
    ///
    /// If any bundle fails to start, every bundle is stopped and the error returned.
    pub fn start(mut self) -> Result<RunningGateway, GatewayError> {
        if let Err(err) = self.start_bundles() {
            warn!(
                event = events::BUNDLE_START_FAILED,
                component = COMPONENT,
                gateway = self.ctx.gateway_name(),
                err = %err,
                "gateway startup aborted"
            );
            for slot in &self.drivers {
                slot.bundle.on_stop(&self.ctx);
            }
            for slot in &self.devices {
                slot.bundle.on_stop(&self.ctx);
            }
            return Err(err);
        }

        let Gateway {
            ctx,
            chain,
            drivers,
            devices,
            selector,
        } = self;

        let drivers: Vec<RunningBundle<dyn Driver>> = drivers
            .into_iter()
            .map(|slot| RunningBundle {
                name: slot.name,
                bundle: Arc::from(slot.bundle),
                lifecycle: slot.lifecycle,
            })
            .collect();

        let dispatcher = Arc::new(Dispatcher {
            ctx: ctx.clone(),
            chain,
            drivers: drivers.iter().map(|slot| slot.bundle.clone()).collect(),
            selector,
            accepting: AtomicBool::new(true),
        });

        let mut running = RunningGateway {
            ctx,
            dispatcher,
            drivers,
            devices: Vec::with_capacity(devices.len()),
        };

        for slot in devices {
            let device: Arc<dyn InputDevice> = Arc::from(slot.bundle);
            let deliverer: Arc<dyn Deliverer> = running.dispatcher.clone();
            match spawn_device_loop(device.clone(), running.ctx.clone(), deliverer) {
                Ok(handle) => running.devices.push(RunningDevice {
                    bundle: RunningBundle {
                        name: slot.name,
                        bundle: device,
                        lifecycle: slot.lifecycle,
                    },
                    handle: Some(handle),
                }),
                Err(source) => {
                    device.on_stop(&running.ctx);
                    running.stop();
                    return Err(GatewayError::Spawn {
                        device: slot.name,
                        source,
                    });
                }
            }
        }

        info!(
            event = events::GATEWAY_START,
            component = COMPONENT,
            gateway = running.ctx.gateway_name(),
            drivers = running.drivers.len(),
            devices = running.devices.len(),
            interceptors = running.dispatcher.chain.len(),
            "gateway started"
        );
        Ok(running)
    }

    fn start_bundles(&mut self) -> Result<(), GatewayError> {
        for slot in &mut self.drivers {
            slot.bundle
                .on_start(&self.ctx)
                .map_err(|source| GatewayError::Start {
                    bundle: slot.name.clone(),
                    source,
                })?;
            slot.advance(BundleState::Started)?;
        }
        for slot in &mut self.devices {
            slot.bundle
                .on_start(&self.ctx)
                .map_err(|source| GatewayError::Start {
                    bundle: slot.name.clone(),
                    source,
                })?;
            slot.advance(BundleState::Started)?;
        }
        Ok(())
    }
}

fn init_bundle<B, F>(
    name: String,
    mut bundle: B,
    config: &BundleConfig,
    ctx: &Context,
    on_init: F,
) -> Result<BundleSlot<B>, GatewayError>
where
    F: FnOnce(&mut B, &BundleConfig, &Context) -> Result<(), ConfigError>,
{
    if let Err(source) = on_init(&mut bundle, config, ctx) {
        warn!(
            event = events::BUNDLE_INIT_FAILED,
            component = COMPONENT,
            bundle = name.as_str(),
            err = %source,
            "bundle rejected its configuration"
        );
        return Err(GatewayError::Init {
            bundle: name,
            source,
        });
    }

    let mut slot = BundleSlot {
        name,
        bundle,
        lifecycle: LifecycleTracker::new(),
    };
    slot.advance(BundleState::Initialized)?;
    Ok(slot)
}

/// One driver's answer to a delivered packet.
#[derive(Debug)]
pub struct DriverReport {
    pub driver: String,
    pub result: Result<Outbound, HandlerError>,
}

/// Everything that happened to one published packet.
#[derive(Debug)]
pub struct PublishReport {
    pub correlation_id: String,
    pub outcome: Outcome,
    pub handled: Vec<DriverReport>,
}

/// The frozen dispatch core: interceptor chain plus driver routing.
pub struct Dispatcher {
    ctx: Context,
    chain: InterceptorChain,
    drivers: Vec<Arc<dyn Driver>>,
    selector: Arc<dyn PipelineSelector>,
    accepting: AtomicBool,
}

impl Dispatcher {
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Publishes `frame` on `topic` under a fresh correlation id.
    pub async fn publish(
        &self,
        topic: &str,
        frame: PacketFrame,
    ) -> Result<PublishReport, DeliverError> {
        self.publish_packet(MessagePacket::new(topic, frame)).await
    }

    /// Runs `packet` through the interceptor chain and, when delivered, through every
    /// driver whose filter matches its topic, in registration order.
    pub async fn publish_packet(
        &self,
        packet: MessagePacket,
    ) -> Result<PublishReport, DeliverError> {
        if !self.is_accepting() {
            warn!(
                event = events::PUBLISH_REJECTED,
                component = COMPONENT,
                topic = packet.topic(),
                reason = fields::REASON_NOT_ACCEPTING,
                "publish rejected"
            );
            return Err(DeliverError::NotAccepting);
        }
        if !is_publishable_topic(packet.topic()) {
            warn!(
                event = events::PUBLISH_REJECTED,
                component = COMPONENT,
                topic = packet.topic(),
                reason = fields::REASON_INVALID_TOPIC,
                "publish rejected"
            );
            return Err(DeliverError::InvalidTopic(packet.topic().to_string()));
        }

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::PUBLISH_ACCEPTED,
                component = COMPONENT,
                topic = packet.topic(),
                correlation_id = packet.correlation_id(),
                payload_len = packet.payload().len(),
                "publish accepted"
            );
        }

        let outcome = self.chain.dispatch(&packet, &self.ctx).await;
        let mut handled = Vec::new();
        if outcome.is_delivered() {
            for driver in &self.drivers {
                if !driver.topic_filter().matches(packet.topic()) {
                    continue;
                }
                handled.push(self.handle_with(driver.as_ref(), &packet).await);
            }
        }

        Ok(PublishReport {
            correlation_id: packet.correlation_id().to_string(),
            outcome,
            handled,
        })
    }

    async fn handle_with(&self, driver: &dyn Driver, packet: &MessagePacket) -> DriverReport {
        let mut session = Session::new(packet.clone());
        let result = driver
            .handle(&mut session, self.selector.as_ref(), &self.ctx)
            .await;

        let result = match result {
            Ok(()) => {
                debug!(
                    event = events::DRIVER_HANDLE_OK,
                    component = COMPONENT,
                    driver = driver.name(),
                    topic = packet.topic(),
                    correlation_id = packet.correlation_id(),
                    elapsed_us = session.since_received().as_micros() as u64,
                    "driver handled request"
                );
                Ok(session.into_outbound())
            }
            Err(err) => {
                warn!(
                    event = events::DRIVER_HANDLE_FAILED,
                    component = COMPONENT,
                    driver = driver.name(),
                    topic = packet.topic(),
                    correlation_id = packet.correlation_id(),
                    err = %err,
                    "driver failed to handle request"
                );
                Err(err)
            }
        };

        DriverReport {
            driver: driver.name().to_string(),
            result,
        }
    }
}

#[async_trait]
impl Deliverer for Dispatcher {
    async fn deliver_publish(&self, topic: &str, frame: PacketFrame) -> Result<(), DeliverError> {
        self.publish(topic, frame).await.map(|_report| ())
    }
}

struct RunningBundle<B: ?Sized> {
    name: String,
    bundle: Arc<B>,
    lifecycle: LifecycleTracker,
}

struct RunningDevice {
    bundle: RunningBundle<dyn InputDevice>,
    handle: Option<DeviceLoopHandle>,
}

/// How one device's serve loop ended.
#[derive(Debug)]
pub struct DeviceExit {
    pub device: String,
    pub address: String,
    pub result: Result<(), ServeError>,
}

/// A started gateway.
pub struct RunningGateway {
    ctx: Context,
    dispatcher: Arc<Dispatcher>,
    drivers: Vec<RunningBundle<dyn Driver>>,
    devices: Vec<RunningDevice>,
}

impl RunningGateway {
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn deliverer(&self) -> Arc<dyn Deliverer> {
        self.dispatcher.clone()
    }

    pub async fn publish(
        &self,
        topic: &str,
        frame: PacketFrame,
    ) -> Result<PublishReport, DeliverError> {
        self.dispatcher.publish(topic, frame).await
    }

    pub fn device_names(&self) -> Vec<&str> {
        self.devices
            .iter()
            .map(|device| device.bundle.name.as_str())
            .collect()
    }

    /// Devices whose serve loop has already exited.
    pub fn finished_devices(&self) -> Vec<&str> {
        self.devices
            .iter()
            .filter(|device| {
                device
                    .handle
                    .as_ref()
                    .map_or(true, DeviceLoopHandle::is_finished)
            })
            .map(|device| device.bundle.name.as_str())
            .collect()
    }

    pub fn bundle_state(&self, name: &str) -> Option<BundleState> {
        self.devices
            .iter()
            .map(|device| &device.bundle)
            .find(|bundle| bundle.name == name)
            .map(|bundle| bundle.lifecycle.state())
            .or_else(|| {
                self.drivers
                    .iter()
                    .find(|bundle| bundle.name == name)
                    .map(|bundle| bundle.lifecycle.state())
            })
    }

    /// Signals every bundle to stop and stops accepting publishes. Returns without
    /// waiting for device loops; use [`RunningGateway::join_devices`] for that.
    pub fn stop(&mut self) {
        // devices before the dispatcher: a publish rejected after cancellation is a clean exit
        for device in &mut self.devices {
            stop_bundle(&mut device.bundle, &self.ctx);
        }
        self.dispatcher.accepting.store(false, Ordering::Release);

        for driver in &mut self.drivers {
            stop_bundle(driver, &self.ctx);
        }

        info!(
            event = events::GATEWAY_STOP,
            component = COMPONENT,
            gateway = self.ctx.gateway_name(),
            "gateway stop signalled"
        );
    }

    /// Blocks until every device loop has exited and returns how each ended.
    pub fn join_devices(mut self) -> Vec<DeviceExit> {
        self.devices
            .iter_mut()
            .filter_map(|device| device.handle.take())
            .map(|handle| {
                let (device, address, result) = handle.join();
                DeviceExit {
                    device,
                    address,
                    result,
                }
            })
            .collect()
    }
}

fn stop_bundle<B>(bundle: &mut RunningBundle<B>, ctx: &Context)
where
    B: Lifecycle + ?Sized,
{
    if bundle.lifecycle.state() == BundleState::Stopped {
        return;
    }
    bundle.bundle.on_stop(ctx);
    if let Err(err) = bundle.lifecycle.advance(BundleState::Stopped) {
        warn!(
            component = COMPONENT,
            bundle = bundle.name.as_str(),
            err = %err,
            "unexpected stop transition"
        );
    }
}
