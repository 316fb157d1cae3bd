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

//! Message packets: the immutable unit flowing through the dispatch pipeline.

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use uuid::Uuid;

/// An immutable, cheaply cloneable byte frame.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
pub struct PacketFrame(Bytes);

impl PacketFrame {
    /// Copies `data` into a new frame owned by the packet.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for PacketFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for PacketFrame {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<&'static [u8]> for PacketFrame {
    fn from(data: &'static [u8]) -> Self {
        Self(Bytes::from_static(data))
    }
}

impl From<Bytes> for PacketFrame {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl Debug for PacketFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PacketFrame({} bytes)", self.0.len())
    }
}

/// String-keyed attribute values attached to packets, sessions and contexts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(HashMap<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Topic, correlation id, payload and attributes of one in-flight event.
#[derive(Clone, Debug, PartialEq)]
pub struct MessagePacket {
    topic: String,
    correlation_id: String,
    payload: PacketFrame,
    attributes: Attributes,
}

impl MessagePacket {
    /// Builds a packet with a freshly generated correlation id.
    pub fn new(topic: impl Into<String>, payload: impl Into<PacketFrame>) -> Self {
        Self::with_correlation_id(topic, Uuid::new_v4().hyphenated().to_string(), payload)
    }

    pub fn with_correlation_id(
        topic: impl Into<String>,
        correlation_id: impl Into<String>,
        payload: impl Into<PacketFrame>,
    ) -> Self {
        Self {
            topic: topic.into(),
            correlation_id: correlation_id.into(),
            payload: payload.into(),
            attributes: Attributes::new(),
        }
    }

    /// Consumes the packet, returning it with `attributes` attached.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn payload(&self) -> &PacketFrame {
        &self.payload
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::{Attributes, MessagePacket, PacketFrame};

    #[test]
    fn copy_from_slice_detaches_from_source_buffer() {
        let mut buffer = vec![1u8, 2, 3, 4];
        let frame = PacketFrame::copy_from_slice(&buffer[..3]);
        buffer[0] = 9;

        assert_eq!(frame.as_bytes(), &[1, 2, 3]);
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn new_packets_get_distinct_correlation_ids() {
        let first = MessagePacket::new("gate/1", vec![1u8]);
        let second = MessagePacket::new("gate/1", vec![1u8]);

        assert!(!first.correlation_id().is_empty());
        assert_ne!(first.correlation_id(), second.correlation_id());
    }

    #[test]
    fn attributes_are_carried_by_the_packet() {
        let attributes: Attributes = [("device", "10.0.0.1:5000"), ("kind", "card")]
            .into_iter()
            .collect();
        let packet =
            MessagePacket::with_correlation_id("gate/1", "c-1", PacketFrame::from(&b"x"[..]))
                .with_attributes(attributes);

        assert_eq!(packet.correlation_id(), "c-1");
        assert_eq!(packet.attributes().get_str("kind"), Some("card"));
        assert_eq!(packet.attributes().len(), 2);
    }

    #[test]
    fn frame_debug_reports_length_only() {
        let frame = PacketFrame::from(vec![0u8; 12]);

        assert_eq!(format!("{frame:?}"), "PacketFrame(12 bytes)");
    }
}
