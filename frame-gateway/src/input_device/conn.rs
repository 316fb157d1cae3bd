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

//! Connectionless transport seam used by datagram input devices.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// A bound datagram endpoint whose reads can be bounded by a deadline.
#[async_trait]
pub trait PacketConn: Send {
    /// Bounds subsequent reads; a read still pending at `deadline` fails with
    /// [`io::ErrorKind::TimedOut`].
    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()>;

    async fn read_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Creates [`PacketConn`]s bound to an address.
#[async_trait]
pub trait PacketListener: Send + Sync {
    async fn listen(&self, address: &str) -> io::Result<Box<dyn PacketConn>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UdpPacketListener;

#[async_trait]
impl PacketListener for UdpPacketListener {
    async fn listen(&self, address: &str) -> io::Result<Box<dyn PacketConn>> {
        let socket = UdpSocket::bind(address).await?;
        Ok(Box::new(UdpPacketConn {
            socket,
            deadline: None,
        }))
    }
}

struct UdpPacketConn {
    socket: UdpSocket,
    deadline: Option<Instant>,
}

#[async_trait]
impl PacketConn for UdpPacketConn {
    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        self.deadline = Some(deadline);
        Ok(())
    }

    async fn read_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let Some(deadline) = self.deadline else {
            return self.socket.recv_from(buf).await;
        };

        match tokio::time::timeout_at(deadline, self.socket.recv_from(buf)).await {
            Ok(read) => read,
            Err(_elapsed) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "read deadline exceeded",
            )),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
