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

//! Workers classify words arriving on client connections against the shared
//! dictionary, write the verdict back to the client, and hand a copy of each
//! verdict to the record queue for journaling.
//!
//! A worker owns at most one connection at a time: it blocks on the
//! connection queue until the acceptor hands it a client, serves that client
//! line by line until the peer disconnects, then returns to the queue for
//! the next one. Transient socket faults never take a worker down; only the
//! client that caused them is affected.

use std::sync::Arc;

use tracing::debug;

use crate::connection::{Connection, LineRead};
use crate::dict::Dictionary;
use crate::journal::Record;
use crate::queue::BoundedQueue;

/// Worker that serves one client connection at a time.
#[derive(Debug)]
pub struct Worker {
    connections: Arc<BoundedQueue<Connection>>,
    records: Arc<BoundedQueue<Record>>,
    dictionary: Arc<Dictionary>,
}

impl Worker {
    /// Creates a worker drawing clients from `connections`, journaling to
    /// `records`, and classifying against `dictionary`.
    pub fn new(
        connections: Arc<BoundedQueue<Connection>>,
        records: Arc<BoundedQueue<Record>>,
        dictionary: Arc<Dictionary>,
    ) -> Self {
        Self {
            connections,
            records,
            dictionary,
        }
    }

    /// Main loop of the worker. Never returns.
    pub fn run(&mut self) {
        loop {
            let mut conn = self.connections.pop();
            debug!(peer = %conn.peer_addr(), "serving connection");

            loop {
                match conn.read_line() {
                    Ok(LineRead::Line(word)) if !word.is_empty() => self.check(&mut conn, &word),
                    // empty request lines produce no response and no record
                    Ok(LineRead::Line(_)) => {}
                    Ok(LineRead::Disconnected) => {
                        debug!(peer = %conn.peer_addr(), "client disconnected, waiting for a new one");
                        break;
                    }
                    Err(err) => {
                        debug!(peer = %conn.peer_addr(), %err, "read failed, closing connection");
                        break;
                    }
                }
            }
            // dropping the connection closes the socket
        }
    }

    /// Classifies `word`, answers the client, and journals the verdict.
    fn check(&self, conn: &mut Connection, word: &[u8]) {
        let verdict: &[u8] = if self.dictionary.contains(word) {
            b"OK"
        } else {
            b"MISSPELLED"
        };

        // The record must not share an allocation with the response: its
        // ownership moves to the journal writer, while the response buffer
        // dies here.
        let mut response = Vec::with_capacity(word.len() + verdict.len() + 2);
        response.extend_from_slice(word);
        response.push(b' ');
        response.extend_from_slice(verdict);
        response.push(b'\n');

        let mut record = Record::with_capacity(word.len() + verdict.len() + 1);
        record.extend_from_slice(word);
        record.push(b' ');
        record.extend_from_slice(verdict);

        if let Err(err) = conn.write_all(&response) {
            debug!(peer = %conn.peer_addr(), %err, "response write failed");
        }

        // journaled whether or not the response reached the client
        self.records.push(record);
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;

    use super::Worker;
    use crate::connection::{Connection, LineRead};
    use crate::dict::Dictionary;
    use crate::listener::Listener;
    use crate::queue::BoundedQueue;

    fn worker_with_dictionary(words: &[u8]) -> Worker {
        Worker::new(
            Arc::new(BoundedQueue::new(1)),
            Arc::new(BoundedQueue::new(16)),
            Arc::new(Dictionary::from_reader(Cursor::new(words.to_vec())).unwrap()),
        )
    }

    #[test]
    fn check_answers_and_journals_a_known_word() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut conn = Connection::connect(addr).unwrap();
            assert_eq!(
                LineRead::Line(b"hello OK".to_vec()),
                conn.read_line().unwrap()
            );
        });

        let worker = worker_with_dictionary(b"hello\n");
        let mut conn = listener.accept().unwrap();
        worker.check(&mut conn, b"hello");

        assert_eq!(b"hello OK".to_vec(), worker.records.pop());
        client.join().unwrap();
    }

    #[test]
    fn check_flags_an_unknown_word_as_misspelled() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut conn = Connection::connect(addr).unwrap();
            assert_eq!(
                LineRead::Line(b"xyzzy MISSPELLED".to_vec()),
                conn.read_line().unwrap()
            );
        });

        let worker = worker_with_dictionary(b"hello\n");
        let mut conn = listener.accept().unwrap();
        worker.check(&mut conn, b"xyzzy");

        assert_eq!(b"xyzzy MISSPELLED".to_vec(), worker.records.pop());
        client.join().unwrap();
    }

    #[test]
    fn check_journals_even_when_the_response_write_fails() {
        let listener = Listener::bind(0).unwrap();
        let addr = listener.local_addr().unwrap();

        // connect and immediately drop the client so the write can fail
        let client = thread::spawn(move || {
            let _conn = Connection::connect(addr).unwrap();
        });

        let worker = worker_with_dictionary(b"hello\n");
        let mut conn = listener.accept().unwrap();
        client.join().unwrap();

        // the first write may land in the socket buffer; push until the
        // broken pipe surfaces, records must keep flowing regardless
        for _ in 0..8 {
            worker.check(&mut conn, b"hello");
        }
        assert_eq!(8, worker.records.len());
    }
}
