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

//! Canonical structured field keys and value-format helpers.

use crate::packet::MessagePacket;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const DEVICE: &str = "device";
pub const ADDRESS: &str = "address";
pub const TOPIC: &str = "topic";
pub const CORRELATION_ID: &str = "correlation_id";
pub const PAYLOAD_LEN: &str = "payload_len";
pub const INTERCEPTOR: &str = "interceptor";
pub const DRIVER: &str = "driver";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_NOT_ACCEPTING: &str = "not_accepting";
pub const REASON_INVALID_TOPIC: &str = "invalid_topic";
pub const DEFAULT_DEVICE_THREAD: &str = "frame-gw-device";

/// Maximum OS thread-name length honoured on Linux.
pub const THREAD_NAME_MAX_LEN: usize = 15;

pub fn format_payload_len(packet: &MessagePacket) -> usize {
    packet.payload().len()
}

/// Renders at most `limit` payload bytes as lowercase hex, marking truncation.
pub fn format_payload_preview(payload: &[u8], limit: usize) -> String {
    if payload.is_empty() {
        return NONE.to_string();
    }
    let mut preview: String = payload
        .iter()
        .take(limit)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    if payload.len() > limit {
        preview.push_str("..");
    }
    preview
}

/// Builds a device thread name from the device address, falling back when the
/// address yields nothing usable.
pub fn device_thread_name(prefix: &str, address: &str) -> String {
    let budget = THREAD_NAME_MAX_LEN.saturating_sub(prefix.len());
    let suffix: String = address
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .rev()
        .take(budget)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if suffix.is_empty() {
        DEFAULT_DEVICE_THREAD.to_string()
    } else {
        format!("{prefix}{suffix}")
    }
}
