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

//! Bundle option snapshots captured at `on_init`.

use crate::topic_expr::{PatternError, TopicFilter};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const TOPICS_KEY: &str = "topics";

/// Missing or invalid bundle configuration. Fatal for the bundle that reports it.
#[derive(Debug)]
pub enum ConfigError {
    Missing { key: String },
    Invalid { key: String, reason: String },
    Pattern { key: String, source: PatternError },
}

impl ConfigError {
    pub fn missing(key: &str) -> Self {
        ConfigError::Missing {
            key: key.to_string(),
        }
    }

    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing { key } => write!(f, "required option '{key}' is missing"),
            ConfigError::Invalid { key, reason } => {
                write!(f, "option '{key}' is invalid: {reason}")
            }
            ConfigError::Pattern { key, source } => {
                write!(f, "option '{key}' holds a bad topic pattern: {source}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Pattern { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Immutable key/value snapshot of a bundle's options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BundleConfig {
    options: Map<String, Value>,
}

impl BundleConfig {
    pub fn new(options: Map<String, Value>) -> Self {
        Self { options }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from a JSON object; any other JSON value is rejected.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(options) => Ok(Self::new(options)),
            Value::Null => Ok(Self::empty()),
            other => Err(ConfigError::invalid(
                "<root>",
                format!("expected an object, found {other}"),
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ConfigError::invalid(key, format!("expected integer, found {value}"))),
        }
    }

    pub fn get_duration_or(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => duration_from_value(value).map_err(|reason| ConfigError::invalid(key, reason)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(value) => Err(ConfigError::invalid(
                key,
                format!("expected string, found {value}"),
            )),
        }
    }

    /// Returns the non-empty string stored under `key`.
    pub fn must_string(&self, key: &str) -> Result<String, ConfigError> {
        match self.get_string(key)? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ConfigError::missing(key)),
        }
    }

    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(single)) => Ok(vec![single.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ConfigError::invalid(key, format!("expected string item, found {item}"))
                    })
                })
                .collect(),
            Some(value) => Err(ConfigError::invalid(
                key,
                format!("expected string list, found {value}"),
            )),
        }
    }

    /// Compiles the `topics` option into a filter. Absent means all topics.
    pub fn topic_filter(&self) -> Result<TopicFilter, ConfigError> {
        let patterns = self.get_string_list(TOPICS_KEY)?;
        TopicFilter::compile(&patterns).map_err(|source| ConfigError::Pattern {
            key: TOPICS_KEY.to_string(),
            source,
        })
    }

    /// Deserializes the whole snapshot into a typed options struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.options.clone()))
            .map_err(|err| ConfigError::invalid("<root>", err.to_string()))
    }
}

impl From<Map<String, Value>> for BundleConfig {
    fn from(options: Map<String, Value>) -> Self {
        Self::new(options)
    }
}

/// Parses `<integer><unit>` with unit `ms`, `s`, `m` or `h`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let split_at = text
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split_at);
    if digits.is_empty() {
        return Err(format!("'{text}' does not start with a number"));
    }
    let amount: u64 = digits
        .parse()
        .map_err(|err| format!("'{text}' has a bad amount: {err}"))?;

    let seconds_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(amount)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => return Err(format!("'{text}' has an unknown unit '{other}'")),
    };
    amount
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("'{text}' is out of range"))
}

fn duration_from_value(value: &Value) -> Result<Duration, String> {
    match value {
        Value::String(text) => parse_duration(text),
        Value::Number(number) => number
            .as_u64()
            .map(Duration::from_secs)
            .ok_or_else(|| format!("expected non-negative seconds, found {number}")),
        other => Err(format!("expected duration, found {other}")),
    }
}

/// `serde(deserialize_with)` adapter for duration options.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    duration_from_value(&value).map_err(de::Error::custom)
}
