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
use frame_gateway::{PacketConn, PacketListener};
use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

const PEER: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40_000));
const LOCAL: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 50_000));

/// One scripted transport result, consumed in order.
#[derive(Clone, Debug)]
pub enum ScriptedStep {
    /// `read_from` returns these bytes.
    Frame(Vec<u8>),
    /// `read_from` fails with this kind.
    Error(io::ErrorKind),
    /// The next `set_read_deadline` fails with this kind.
    DeadlineError(io::ErrorKind),
}

/// In-memory [`PacketListener`] whose connection replays a fixed script.
///
/// Once the script is exhausted, reads wait for the read deadline and time out, the
/// way an idle socket would.
#[derive(Clone, Default)]
pub struct ScriptedListener {
    script: Arc<Mutex<VecDeque<ScriptedStep>>>,
    bind_error: Option<io::ErrorKind>,
    reads: Arc<AtomicUsize>,
    listens: Arc<AtomicUsize>,
}

impl ScriptedListener {
    pub fn new(steps: impl IntoIterator<Item = ScriptedStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn failing_bind(kind: io::ErrorKind) -> Self {
        Self {
            bind_error: Some(kind),
            ..Self::default()
        }
    }

    /// Number of `read_from` calls served so far, including timed-out ones.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn listens(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|script| script.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PacketListener for ScriptedListener {
    async fn listen(&self, _address: &str) -> io::Result<Box<dyn PacketConn>> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.bind_error {
            return Err(io::Error::new(kind, "scripted bind failure"));
        }
        Ok(Box::new(ScriptedConn {
            script: self.script.clone(),
            reads: self.reads.clone(),
            deadline: None,
        }))
    }
}

struct ScriptedConn {
    script: Arc<Mutex<VecDeque<ScriptedStep>>>,
    reads: Arc<AtomicUsize>,
    deadline: Option<Instant>,
}

impl ScriptedConn {
    fn next_step(&self) -> Option<ScriptedStep> {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
    }
}

#[async_trait]
impl PacketConn for ScriptedConn {
    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        if let Ok(mut script) = self.script.lock() {
            if let Some(ScriptedStep::DeadlineError(kind)) = script.front().cloned() {
                script.pop_front();
                return Err(io::Error::new(kind, "scripted deadline failure"));
            }
        }
        self.deadline = Some(deadline);
        Ok(())
    }

    async fn read_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            Some(ScriptedStep::Frame(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok((n, PEER))
            }
            Some(ScriptedStep::Error(kind)) | Some(ScriptedStep::DeadlineError(kind)) => {
                Err(io::Error::new(kind, "scripted read error"))
            }
            None => {
                if let Some(deadline) = self.deadline {
                    tokio::time::sleep_until(deadline).await;
                }
                Err(io::Error::new(io::ErrorKind::TimedOut, "read deadline exceeded"))
            }
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(LOCAL)
    }
}
