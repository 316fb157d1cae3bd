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

//! UDP server-mode input device.

use super::conn::{PacketListener, UdpPacketListener};
use super::{is_temporary, DeviceAddress, InputDevice, ServeError};
use crate::bundle::{Lifecycle, Named};
use crate::config::{BundleConfig, ConfigError};
use crate::context::Context;
use crate::deliverer::Deliverer;
use crate::observability::{events, fields};
use crate::packet::PacketFrame;
use crate::topic_expr::is_publishable_topic;
use async_trait::async_trait;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn, Level};

const COMPONENT: &str = "udp_input_device";

pub const BUFFER_SIZE_KB: &str = "bufferSizeKB";
pub const READ_TIMEOUT: &str = "readTimeout";
pub const TOPIC: &str = "topic";

const DEFAULT_BUFFER_SIZE_KB: i64 = 1;
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
const PREVIEW_BYTES: usize = 16;

/// Receives every frame the device reads, in read order, on the device's loop.
#[async_trait]
pub trait ServeHandler: Send + Sync {
    async fn on_frame(
        &self,
        frame: PacketFrame,
        ctx: &Context,
        deliverer: &dyn Deliverer,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Default handler: publishes each frame to a fixed topic.
#[derive(Clone, Debug)]
pub struct PublishToTopic {
    topic: String,
}

impl PublishToTopic {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
        }
    }
}

#[async_trait]
impl ServeHandler for PublishToTopic {
    async fn on_frame(
        &self,
        frame: PacketFrame,
        _ctx: &Context,
        deliverer: &dyn Deliverer,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        deliverer.deliver_publish(&self.topic, frame).await?;
        Ok(())
    }
}

/// Listens for datagrams on `group:private` and hands each non-empty frame to its
/// [`ServeHandler`].
///
/// Options: `bufferSizeKB` (default 1), `readTimeout` (default `10s`) and `topic`,
/// which is required unless a handler is installed with
/// [`UdpInputDevice::set_serve_handler`] before start.
pub struct UdpInputDevice {
    name: String,
    address: DeviceAddress,
    max_buffer_size: usize,
    read_timeout: Duration,
    topic: Option<String>,
    listener: Arc<dyn PacketListener>,
    handler: Option<Arc<dyn ServeHandler>>,
    cancel: CancellationToken,
    bound: OnceLock<SocketAddr>,
}

impl UdpInputDevice {
    pub fn new(name: &str, address: DeviceAddress) -> Self {
        Self::with_listener(name, address, Arc::new(UdpPacketListener))
    }

    /// Builds a device that binds through `listener` instead of a real UDP socket.
    pub fn with_listener(
        name: &str,
        address: DeviceAddress,
        listener: Arc<dyn PacketListener>,
    ) -> Self {
        Self {
            name: name.to_string(),
            address,
            max_buffer_size: (DEFAULT_BUFFER_SIZE_KB as usize) * 1024,
            read_timeout: DEFAULT_READ_TIMEOUT,
            topic: None,
            listener,
            handler: None,
            cancel: CancellationToken::new(),
            bound: OnceLock::new(),
        }
    }

    pub fn set_serve_handler(&mut self, handler: Arc<dyn ServeHandler>) {
        self.handler = Some(handler);
    }

    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Address the transport actually bound, once serving.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.get().copied()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Named for UdpInputDevice {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Lifecycle for UdpInputDevice {
    fn on_init(&mut self, config: &BundleConfig, _ctx: &Context) -> Result<(), ConfigError> {
        let buffer_size_kb = config.get_i64_or(BUFFER_SIZE_KB, DEFAULT_BUFFER_SIZE_KB)?;
        if buffer_size_kb < 1 {
            return Err(ConfigError::invalid(BUFFER_SIZE_KB, "must be at least 1"));
        }
        let max_buffer_size = usize::try_from(buffer_size_kb)
            .ok()
            .and_then(|kb| kb.checked_mul(1024))
            .ok_or_else(|| ConfigError::invalid(BUFFER_SIZE_KB, "too large"))?;

        let read_timeout = config.get_duration_or(READ_TIMEOUT, DEFAULT_READ_TIMEOUT)?;
        if read_timeout.is_zero() {
            return Err(ConfigError::invalid(READ_TIMEOUT, "must be greater than zero"));
        }
        if read_deadline(read_timeout).is_none() {
            return Err(ConfigError::invalid(READ_TIMEOUT, "too large"));
        }

        let topic = config.get_string(TOPIC)?.filter(|topic| !topic.is_empty());
        if let Some(topic) = &topic {
            if !is_publishable_topic(topic) {
                return Err(ConfigError::invalid(
                    TOPIC,
                    format!("'{topic}' is not a concrete topic"),
                ));
            }
        }

        self.max_buffer_size = max_buffer_size;
        self.read_timeout = read_timeout;
        self.topic = topic;
        Ok(())
    }

    fn on_start(&mut self, _ctx: &Context) -> Result<(), ConfigError> {
        self.cancel = CancellationToken::new();
        if self.handler.is_some() {
            return Ok(());
        }

        let Some(topic) = self.topic.as_deref() else {
            return Err(ConfigError::missing(TOPIC));
        };
        info!(
            event = events::DEVICE_DEFAULT_HANDLER,
            component = COMPONENT,
            device = self.name.as_str(),
            topic,
            "publishing frames to configured topic"
        );
        self.handler = Some(Arc::new(PublishToTopic::new(topic)));
        Ok(())
    }

    fn on_stop(&self, _ctx: &Context) {
        self.cancel.cancel();
    }
}

fn read_deadline(read_timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(read_timeout)
}

#[async_trait]
impl InputDevice for UdpInputDevice {
    fn address(&self) -> &DeviceAddress {
        &self.address
    }

    async fn serve(&self, ctx: &Context, deliverer: &dyn Deliverer) -> Result<(), ServeError> {
        let handler = self.handler.clone().ok_or(ServeError::HandlerMissing)?;
        let address = self.address.union();
        let mut conn = self
            .listener
            .listen(&address)
            .await
            .map_err(|source| ServeError::Bind {
                address: address.clone(),
                source,
            })?;
        if let Ok(local) = conn.local_addr() {
            let _ = self.bound.set(local);
        }
        info!(
            event = events::DEVICE_LISTEN,
            component = COMPONENT,
            device = self.name.as_str(),
            address = address.as_str(),
            "listening for datagrams"
        );

        let mut buffer = vec![0u8; self.max_buffer_size];
        loop {
            // The bounded read below is what makes this check periodic.
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let deadline = read_deadline(self.read_timeout).ok_or_else(|| {
                ServeError::Transport(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "read deadline is not representable",
                ))
            })?;
            if let Err(err) = conn.set_read_deadline(deadline) {
                if !is_temporary(&err) {
                    return Err(ServeError::Transport(err));
                }
                continue;
            }

            match conn.read_from(&mut buffer).await {
                Ok((0, _)) => {}
                Ok((n, peer)) => {
                    let frame = PacketFrame::copy_from_slice(&buffer[..n]);
                    if tracing::enabled!(Level::DEBUG) {
                        let preview = fields::format_payload_preview(&frame, PREVIEW_BYTES);
                        debug!(
                            event = events::DEVICE_FRAME_RECEIVED,
                            component = COMPONENT,
                            device = self.name.as_str(),
                            peer = %peer,
                            payload_len = n,
                            payload = preview.as_str(),
                            "frame received"
                        );
                    }
                    if let Err(err) = handler.on_frame(frame, ctx, deliverer).await {
                        // a gateway stopping mid-frame rejects the publish
                        if self.cancel.is_cancelled() {
                            return Ok(());
                        }
                        warn!(
                            event = events::DEVICE_SERVE_FAILED,
                            component = COMPONENT,
                            device = self.name.as_str(),
                            address = address.as_str(),
                            err = %err,
                            "serve handler failed"
                        );
                        return Err(ServeError::Handler(err));
                    }
                }
                Err(err) if is_temporary(&err) => {
                    trace!(
                        event = events::DEVICE_READ_TEMPORARY,
                        component = COMPONENT,
                        device = self.name.as_str(),
                        err = %err,
                        "temporary read condition"
                    );
                }
                Err(err) => return Err(ServeError::Transport(err)),
            }
        }
    }
}
