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

//! Ordered, topic-filtered, short-circuiting interceptor chain.

use super::{FnInterceptor, Intercept, InterceptError, Interceptor, InterceptorMeta};
use crate::context::Context;
use crate::observability::{events, fields};
use crate::packet::MessagePacket;
use crate::topic_expr::{PatternError, TopicMatcher};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn, Level};

const COMPONENT: &str = "interceptor_chain";

/// Registration rejected because the name is already taken in this chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuplicateNameError {
    pub name: String,
}

impl Display for DuplicateNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "interceptor '{}' is already registered", self.name)
    }
}

impl Error for DuplicateNameError {}

/// Final result of dispatching one packet through the chain.
#[derive(Debug)]
pub enum Outcome {
    Delivered,
    Dropped { by: String },
    Failed { by: String, error: InterceptError },
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered)
    }
}

/// Sorted dispatch order plus the membership version it was built from.
#[derive(Debug)]
struct SortedIndex {
    version: u64,
    order: Vec<usize>,
}

/// Interceptors in registration order, with a lazily built priority view.
///
/// Mutation needs `&mut self`, so the chain cannot change while a dispatch holds
/// `&self`. The gateway freezes it behind an `Arc` once serving starts.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    version: u64,
    sorted: OnceLock<SortedIndex>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<(), DuplicateNameError> {
        if self.contains(interceptor.name()) {
            return Err(DuplicateNameError {
                name: interceptor.name().to_string(),
            });
        }

        self.interceptors.push(interceptor);
        self.version += 1;
        self.sorted = OnceLock::new();
        Ok(())
    }

    /// Registers a closure-backed interceptor compiled from `topics`.
    pub fn register_fn<I, S, F>(
        &mut self,
        name: &str,
        priority: i32,
        topics: I,
        handler: F,
    ) -> Result<(), RegisterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&MessagePacket, &Context) -> Intercept + Send + Sync + 'static,
    {
        let meta = InterceptorMeta::new(name, priority, topics).map_err(RegisterError::Pattern)?;
        self.register(Arc::new(FnInterceptor::new(meta, handler)))
            .map_err(RegisterError::DuplicateName)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interceptors.iter().any(|existing| existing.name() == name)
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Membership version; bumps on every successful registration.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Interceptor names in dispatch order.
    pub fn dispatch_order(&self) -> Vec<&str> {
        self.sorted_index()
            .order
            .iter()
            .map(|&idx| self.interceptors[idx].name())
            .collect()
    }

    fn sorted_index(&self) -> &SortedIndex {
        self.sorted.get_or_init(|| {
            let mut order: Vec<usize> = (0..self.interceptors.len()).collect();
            // stable sort keeps registration order among equal priorities
            order.sort_by_key(|&idx| std::cmp::Reverse(self.interceptors[idx].priority()));
            SortedIndex {
                version: self.version,
                order,
            }
        })
    }

    /// Runs every interceptor whose filter matches `packet.topic()`, highest priority
    /// first, stopping at the first drop or failure.
    pub async fn dispatch(&self, packet: &MessagePacket, ctx: &Context) -> Outcome {
        let index = self.sorted_index();
        debug_assert_eq!(index.version, self.version);

        for &idx in &index.order {
            let interceptor = &self.interceptors[idx];
            if !interceptor.topic_filter().matches(packet.topic()) {
                continue;
            }

            match interceptor.handle(packet, ctx).await {
                Intercept::Next => {}
                Intercept::Drop => {
                    if tracing::enabled!(Level::DEBUG) {
                        debug!(
                            event = events::DISPATCH_DROPPED,
                            component = COMPONENT,
                            interceptor = interceptor.name(),
                            topic = packet.topic(),
                            correlation_id = packet.correlation_id(),
                            payload_len = fields::format_payload_len(packet),
                            "packet dropped by interceptor"
                        );
                    }
                    return Outcome::Dropped {
                        by: interceptor.name().to_string(),
                    };
                }
                Intercept::Fail(error) => {
                    warn!(
                        event = events::DISPATCH_FAILED,
                        component = COMPONENT,
                        interceptor = interceptor.name(),
                        topic = packet.topic(),
                        correlation_id = packet.correlation_id(),
                        err = %error,
                        "interceptor failed; chain stopped"
                    );
                    return Outcome::Failed {
                        by: interceptor.name().to_string(),
                        error,
                    };
                }
            }
        }

        Outcome::Delivered
    }
}

/// Failures of [`InterceptorChain::register_fn`].
#[derive(Debug)]
pub enum RegisterError {
    Pattern(PatternError),
    DuplicateName(DuplicateNameError),
}

impl Display for RegisterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::Pattern(err) => write!(f, "invalid interceptor topic: {err}"),
            RegisterError::DuplicateName(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegisterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegisterError::Pattern(err) => Some(err),
            RegisterError::DuplicateName(err) => Some(err),
        }
    }
}
