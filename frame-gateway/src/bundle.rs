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

//! Capabilities shared by every pluggable unit (input devices, drivers).
//!
//! A bundle moves through `Created -> Initialized -> Started -> Stopped`. The
//! [`LifecycleTracker`] enforces that order on behalf of the owning gateway; bundles
//! only implement the hooks.

use crate::config::{BundleConfig, ConfigError};
use crate::context::Context;
use crate::topic_expr::TopicFilter;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub trait Named {
    fn name(&self) -> &str;
}

pub trait TopicFiltered {
    fn topic_filter(&self) -> &TopicFilter;
}

/// Lifecycle hooks of a bundle.
pub trait Lifecycle: Send + Sync {
    /// Validates and snapshots configuration. Errors abort bundle startup.
    fn on_init(&mut self, config: &BundleConfig, ctx: &Context) -> Result<(), ConfigError>;

    /// Acquires start-time state and makes one-time fallback decisions.
    fn on_start(&mut self, ctx: &Context) -> Result<(), ConfigError>;

    /// Signals running work to stop. Must not block on loop exit and must be safe
    /// after a partially failed `on_start`.
    fn on_stop(&self, ctx: &Context);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BundleState {
    Created,
    Initialized,
    Started,
    Stopped,
}

impl Display for BundleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BundleState::Created => "created",
            BundleState::Initialized => "initialized",
            BundleState::Started => "started",
            BundleState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum LifecycleError {
    InvalidTransition { from: BundleState, to: BundleState },
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::InvalidTransition { from, to } => {
                write!(f, "bundle cannot move from {from} to {to}")
            }
        }
    }
}

impl Error for LifecycleError {}

/// Tracks one bundle's lifecycle state and rejects out-of-order transitions.
#[derive(Debug)]
pub struct LifecycleTracker {
    state: BundleState,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self {
            state: BundleState::Created,
        }
    }

    pub fn state(&self) -> BundleState {
        self.state
    }

    pub fn advance(&mut self, to: BundleState) -> Result<(), LifecycleError> {
        let allowed = matches!(
            (self.state, to),
            (BundleState::Created, BundleState::Initialized)
                | (BundleState::Initialized, BundleState::Started)
                // a bundle whose start failed is still stoppable
                | (BundleState::Initialized, BundleState::Stopped)
                | (BundleState::Started, BundleState::Stopped)
        );

        if !allowed {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}
