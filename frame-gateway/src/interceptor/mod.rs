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

//! Interceptors: priority- and topic-scoped handlers that admit, drop or fail packets.

mod chain;
pub use chain::{DuplicateNameError, InterceptorChain, Outcome, RegisterError};

use crate::bundle::{Named, TopicFiltered};
use crate::context::Context;
use crate::packet::MessagePacket;
use crate::topic_expr::{PatternError, TopicFilter};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Result of one interceptor invocation.
#[derive(Debug)]
pub enum Intercept {
    /// Hand the packet to the next matching interceptor.
    Next,
    /// Stop the chain for this packet; nothing downstream sees it.
    Drop,
    /// Stop the chain because the handler malfunctioned.
    Fail(InterceptError),
}

/// A handler malfunction, as opposed to an intentional drop.
#[derive(Debug)]
pub struct InterceptError {
    source: Box<dyn Error + Send + Sync>,
}

impl InterceptError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Display for InterceptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "interceptor failed: {}", self.source)
    }
}

impl Error for InterceptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

#[async_trait]
pub trait Interceptor: Named + TopicFiltered + Send + Sync {
    /// Higher priorities run earlier.
    fn priority(&self) -> i32;

    async fn handle(&self, packet: &MessagePacket, ctx: &Context) -> Intercept;
}

/// Name, priority and topic filter shared by interceptor implementations.
#[derive(Clone, Debug)]
pub struct InterceptorMeta {
    name: String,
    priority: i32,
    topic_filter: TopicFilter,
}

impl InterceptorMeta {
    pub fn new<I, S>(name: &str, priority: i32, topics: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            name: name.to_string(),
            priority,
            topic_filter: TopicFilter::compile(topics)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn topic_filter(&self) -> &TopicFilter {
        &self.topic_filter
    }
}

type HandlerFn = dyn Fn(&MessagePacket, &Context) -> Intercept + Send + Sync;

/// Interceptor backed by a plain closure.
pub struct FnInterceptor {
    meta: InterceptorMeta,
    handler: Box<HandlerFn>,
}

impl FnInterceptor {
    pub fn new<F>(meta: InterceptorMeta, handler: F) -> Self
    where
        F: Fn(&MessagePacket, &Context) -> Intercept + Send + Sync + 'static,
    {
        Self {
            meta,
            handler: Box::new(handler),
        }
    }
}

impl Named for FnInterceptor {
    fn name(&self) -> &str {
        self.meta.name()
    }
}

impl TopicFiltered for FnInterceptor {
    fn topic_filter(&self) -> &TopicFilter {
        self.meta.topic_filter()
    }
}

#[async_trait]
impl Interceptor for FnInterceptor {
    fn priority(&self) -> i32 {
        self.meta.priority()
    }

    async fn handle(&self, packet: &MessagePacket, ctx: &Context) -> Intercept {
        (self.handler)(packet, ctx)
    }
}

impl Debug for FnInterceptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnInterceptor")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
