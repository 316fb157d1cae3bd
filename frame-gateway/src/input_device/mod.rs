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

//! Input devices: bundles that own a read loop against an external transport and
//! publish what they read through a [`Deliverer`].

mod conn;
mod udp;

pub use conn::{PacketConn, PacketListener, UdpPacketListener};
pub use udp::{PublishToTopic, ServeHandler, UdpInputDevice};

use crate::bundle::{Lifecycle, Named};
use crate::context::Context;
use crate::deliverer::Deliverer;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

/// Device identity: a group and a private component joined as `group:private`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DeviceAddress {
    group: String,
    private: String,
}

impl DeviceAddress {
    pub fn new(group: &str, private: &str) -> Self {
        Self {
            group: group.to_string(),
            private: private.to_string(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn private(&self) -> &str {
        &self.private
    }

    pub fn union(&self) -> String {
        format!("{}:{}", self.group, self.private)
    }
}

impl Display for DeviceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group, self.private)
    }
}

/// Why a serve loop ended abnormally.
#[derive(Debug)]
pub enum ServeError {
    HandlerMissing,
    Bind { address: String, source: io::Error },
    Transport(io::Error),
    Handler(Box<dyn Error + Send + Sync>),
    Runtime(io::Error),
}

impl Display for ServeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::HandlerMissing => {
                write!(f, "no serve handler installed; was the device started?")
            }
            ServeError::Bind { address, source } => {
                write!(f, "unable to bind {address}: {source}")
            }
            ServeError::Transport(err) => write!(f, "transport failed: {err}"),
            ServeError::Handler(err) => write!(f, "serve handler failed: {err}"),
            ServeError::Runtime(err) => write!(f, "device runtime failed: {err}"),
        }
    }
}

impl Error for ServeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServeError::HandlerMissing => None,
            ServeError::Bind { source, .. } => Some(source),
            ServeError::Transport(err) | ServeError::Runtime(err) => Some(err),
            ServeError::Handler(err) => Some(err.as_ref()),
        }
    }
}

/// A timeout or retryable condition; the serve loop swallows these and carries on.
pub fn is_temporary(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[async_trait]
pub trait InputDevice: Lifecycle + Named {
    fn address(&self) -> &DeviceAddress;

    /// Runs the read loop until cancellation (`Ok`) or a non-recoverable failure.
    async fn serve(&self, ctx: &Context, deliverer: &dyn Deliverer) -> Result<(), ServeError>;
}

#[cfg(test)]
mod tests {
    use super::{is_temporary, DeviceAddress};
    use std::io;

    #[test]
    fn union_address_joins_group_and_private() {
        let address = DeviceAddress::new("0.0.0.0", "5000");

        assert_eq!(address.union(), "0.0.0.0:5000");
        assert_eq!(address.to_string(), address.union());
    }

    #[test]
    fn temporary_classification() {
        for kind in [
            io::ErrorKind::TimedOut,
            io::ErrorKind::WouldBlock,
            io::ErrorKind::Interrupted,
        ] {
            assert!(is_temporary(&io::Error::from(kind)), "{kind:?}");
        }
        for kind in [
            io::ErrorKind::PermissionDenied,
            io::ErrorKind::NotConnected,
            io::ErrorKind::AddrNotAvailable,
            io::ErrorKind::ConnectionReset,
        ] {
            assert!(!is_temporary(&io::Error::from(kind)), "{kind:?}");
        }
    }
}
