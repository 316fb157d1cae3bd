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

//! # frame-gateway
//!
//! `frame-gateway` reads raw datagrams from network input devices, turns each one into
//! a topic-addressed [`MessagePacket`], runs it through a priority-ordered
//! [`InterceptorChain`] and hands admitted packets to every [`Driver`] whose topic
//! filter matches.
//!
//! ## Quick start
//!
//! ```
//! use frame_gateway::{Gateway, Intercept, PacketFrame};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut gateway = Gateway::new("quick-start");
//! gateway
//!     .register_interceptor_fn("deny-test", 100, ["test/#"], |_, _| Intercept::Drop)
//!     .unwrap();
//!
//! let mut running = gateway.start().unwrap();
//!
//! let report = running
//!     .publish("gate/3/open", PacketFrame::from(vec![0x01]))
//!     .await
//!     .unwrap();
//! assert!(report.outcome.is_delivered());
//!
//! let report = running
//!     .publish("test/probe", PacketFrame::from(vec![0x01]))
//!     .await
//!     .unwrap();
//! assert!(!report.outcome.is_delivered());
//!
//! running.stop();
//! assert!(running.publish("gate/3/open", PacketFrame::from(vec![0x01])).await.is_err());
//! # });
//! ```
//!
//! ## Topic expressions
//!
//! Topics are `/`-separated segments. In patterns, `+` (or its alias `*`) matches
//! exactly one segment and a trailing `#` matches one or more. The lone pattern `*`
//! matches every topic. An empty filter matches every topic as well.
//!
//! ## Internal architecture map
//!
//! - Assembly: [`Gateway`] owns registration and bundle lifecycles
//! - Dispatch: [`Dispatcher`] runs the interceptor chain, then matching drivers
//! - Ingress: [`InputDevice`] serve loops, one named thread each
//! - Egress: drivers pick [`OutputDevice`]s through a [`PipelineSelector`]
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber. Binaries
//! and tests are responsible for one-time `tracing_subscriber` initialization.

pub mod bundle;
pub use bundle::{BundleState, Lifecycle, LifecycleError, Named, TopicFiltered};

mod config;
pub use config::{deserialize_duration, parse_duration, BundleConfig, ConfigError, TOPICS_KEY};

mod context;
pub use context::Context;

mod deliverer;
pub use deliverer::{DeliverError, Deliverer};

pub mod driver;
pub use driver::{
    Driver, DriverCore, HandlerError, OutputDevice, Outbound, PipelineRegistry,
    PipelineSelector, SelectCriteria, SelectError, Session,
};

mod gateway;
pub use gateway::{
    DeviceExit, Dispatcher, DriverReport, Gateway, GatewayError, PublishReport, RunningGateway,
};

pub mod input_device;
pub use input_device::{
    DeviceAddress, InputDevice, PacketConn, PacketListener, ServeError, ServeHandler,
    UdpInputDevice, UdpPacketListener,
};

pub mod interceptor;
pub use interceptor::{
    Intercept, InterceptError, Interceptor, InterceptorChain, InterceptorMeta, Outcome,
};

#[doc(hidden)]
pub mod observability;

mod packet;
pub use packet::{Attributes, MessagePacket, PacketFrame};

mod runtime;

pub mod topic_expr;
pub use topic_expr::{PatternError, TopicExpr, TopicFilter, TopicMatcher};
