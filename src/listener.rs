// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Listening socket for the server.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener};

use socket2::{Domain, Protocol, Socket, Type};

use crate::connection::Connection;

// Kept small on purpose: once all workers are busy and the connection queue
// is full, the kernel's backlog is the only buffer for waiting clients.
const BACKLOG: i32 = 3;

/// Listening TCP socket bound to `0.0.0.0` with address reuse enabled.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Binds to `0.0.0.0:port` and starts listening.
    ///
    /// Port 0 asks the OS for an ephemeral port; use [`Listener::local_addr`]
    /// to learn the bound address.
    pub fn bind(port: u16) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        socket.bind(&addr.into())?;
        socket.listen(BACKLOG)?;

        Ok(Self {
            inner: socket.into(),
        })
    }

    /// Blocks until a client connects, then returns the owned connection.
    pub fn accept(&self) -> io::Result<Connection> {
        let (stream, peer) = self.inner.accept()?;
        Ok(Connection::new(stream, peer))
    }

    /// Address this listener is bound to.
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
