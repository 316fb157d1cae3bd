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

use async_trait::async_trait;
use frame_gateway::{Context, DeliverError, Deliverer, OutputDevice, PacketFrame};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// [`Deliverer`] that records every publish it accepts.
#[derive(Clone, Default)]
pub struct RecordingDeliverer {
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    reject: Option<DeliverError>,
    notify: Arc<Notify>,
}

impl RecordingDeliverer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A deliverer that refuses every publish with `err`.
    pub fn rejecting(err: DeliverError) -> Self {
        Self {
            reject: Some(err),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    /// Waits until at least `count` publishes were recorded or `timeout` passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<(String, Vec<u8>)> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.published().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.published()
    }
}

#[async_trait]
impl Deliverer for RecordingDeliverer {
    async fn deliver_publish(&self, topic: &str, frame: PacketFrame) -> Result<(), DeliverError> {
        if let Some(err) = &self.reject {
            return Err(err.clone());
        }
        if let Ok(mut published) = self.published.lock() {
            published.push((topic.to_string(), frame.to_vec()));
        }
        self.notify.notify_waiters();
        Ok(())
    }
}

/// [`OutputDevice`] that records frames and answers with a fixed reply.
pub struct RecordingOutputDevice {
    proto: String,
    address: String,
    reply: Vec<u8>,
    received: Mutex<Vec<Vec<u8>>>,
}

impl RecordingOutputDevice {
    pub fn new(proto: &str, address: &str, reply: &[u8]) -> Self {
        Self {
            proto: proto.to_string(),
            address: address.to_string(),
            reply: reply.to_vec(),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OutputDevice for RecordingOutputDevice {
    fn proto(&self) -> &str {
        &self.proto
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn process(&self, frame: PacketFrame, _ctx: &Context) -> io::Result<PacketFrame> {
        self.received
            .lock()
            .map_err(|_| io::Error::other("recorder poisoned"))?
            .push(frame.to_vec());
        Ok(PacketFrame::from(self.reply.clone()))
    }
}
