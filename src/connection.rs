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

//! One TCP connection, exposing blocking line reads and byte writes.
//!
//! A `Connection` is exclusively owned: the listener creates it, handing it
//! to the connection queue transfers it to the consuming worker, and dropping
//! it closes the socket. Line reads distinguish a peer that closed cleanly
//! between lines (`Disconnected`) from one that closed mid-line, in which
//! case the bytes read so far come back as the final line.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

// Lines are accumulated one byte at a time; correctness over throughput.
const INITIAL_LINE_CAPACITY: usize = 256;

/// Outcome of a blocking line read.
#[derive(Debug, PartialEq, Eq)]
pub enum LineRead {
    /// One line, excluding the terminating LF.
    Line(Vec<u8>),
    /// The peer closed with no bytes pending since the previous line.
    Disconnected,
}

/// An owned handle to one TCP connection.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }

    /// Connects to a server as a client.
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Address of the peer on the other end of this connection.
    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Reads one LF-terminated line, blocking until the LF or peer close.
    ///
    /// The returned line excludes the LF. If the peer closes after sending
    /// some bytes but no LF, those bytes are the final line; if it closes
    /// with nothing pending, the read reports [`LineRead::Disconnected`].
    pub fn read_line(&mut self) -> io::Result<LineRead> {
        let mut line = Vec::with_capacity(INITIAL_LINE_CAPACITY);
        let mut byte = [0u8; 1];

        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => {
                    return Ok(if line.is_empty() {
                        LineRead::Disconnected
                    } else {
                        LineRead::Line(line)
                    });
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        return Ok(LineRead::Line(line));
                    }
                    line.push(byte[0]);
                }
                Err(ref err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Writes all of `bytes` to the peer.
    #[inline]
    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    /// Shuts down the read, write, or both halves of the connection.
    #[inline]
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.stream.shutdown(how)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::net::TcpStream;
    use std::thread;

    use super::{Connection, LineRead};
    use crate::listener::Listener;

    #[test]
    fn read_line_returns_bytes_before_the_lf() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"hello\nworld\n").unwrap();
        });

        let mut conn = listener.accept().unwrap();
        assert_eq!(LineRead::Line(b"hello".to_vec()), conn.read_line().unwrap());
        assert_eq!(LineRead::Line(b"world".to_vec()), conn.read_line().unwrap());
        client.join().unwrap();
    }

    #[test]
    fn empty_line_is_returned_as_an_empty_payload() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"\n").unwrap();
        });

        let mut conn = listener.accept().unwrap();
        assert_eq!(LineRead::Line(Vec::new()), conn.read_line().unwrap());
        client.join().unwrap();
    }

    #[test]
    fn peer_close_mid_line_yields_the_partial_final_line() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"hel").unwrap();
        });

        let mut conn = listener.accept().unwrap();
        assert_eq!(LineRead::Line(b"hel".to_vec()), conn.read_line().unwrap());
        assert_eq!(LineRead::Disconnected, conn.read_line().unwrap());
        client.join().unwrap();
    }

    #[test]
    fn clean_peer_close_yields_disconnected() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let _stream = TcpStream::connect(addr).unwrap();
        });

        let mut conn = listener.accept().unwrap();
        assert_eq!(LineRead::Disconnected, conn.read_line().unwrap());
        client.join().unwrap();
    }

    #[test]
    fn lines_longer_than_the_initial_buffer_are_read_whole() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            let mut long = vec![b'x'; 4096];
            long.push(b'\n');
            stream.write_all(&long).unwrap();
        });

        let mut conn = listener.accept().unwrap();
        assert_eq!(
            LineRead::Line(vec![b'x'; 4096]),
            conn.read_line().unwrap()
        );
        client.join().unwrap();
    }

    #[test]
    fn connect_and_write_round_trip() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut conn = Connection::connect(addr).unwrap();
            conn.write_all(b"ping\n").unwrap();
            assert_eq!(LineRead::Line(b"pong".to_vec()), conn.read_line().unwrap());
        });

        let mut conn = listener.accept().unwrap();
        assert_eq!(LineRead::Line(b"ping".to_vec()), conn.read_line().unwrap());
        conn.write_all(b"pong\n").unwrap();
        client.join().unwrap();
    }
}
