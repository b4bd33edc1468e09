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

//! Server wiring: startup, the worker pool, the journal thread, and the
//! accept loop.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dict::{BuildError, Dictionary};
use crate::journal::{Journal, JournalWriter, Record};
use crate::listener::Listener;
use crate::queue::BoundedQueue;
use crate::worker::Worker;

// Journal records drain much faster than clients produce words, so the
// record queue is far deeper than the connection queue. It still blocks
// rather than drops when the journal thread falls behind.
const RECORD_QUEUE_CAPACITY: usize = 4096;

/// A failure that prevents the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The dictionary file could not be loaded.
    #[error(transparent)]
    Dictionary(#[from] BuildError),

    /// The listening socket could not be bound.
    #[error("could not listen on port {port}: {source}")]
    Listen {
        /// Requested port.
        port: u16,
        /// Underlying socket failure.
        source: io::Error,
    },

    /// The journal file could not be created.
    #[error("could not open journal {}: {source}", path.display())]
    Journal {
        /// Journal path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// A worker or journal thread could not be spawned.
    #[error("could not spawn {name} thread: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// Underlying spawn failure.
        source: io::Error,
    },
}

/// The spell-check server: dictionary, listener, worker pool and journal.
#[derive(Debug)]
pub struct Server {
    config: Config,
    listener: Listener,
    dictionary: Arc<Dictionary>,
}

impl Server {
    /// Loads the dictionary and binds the listening socket.
    pub fn bind(config: Config) -> Result<Self, StartupError> {
        let dictionary = Dictionary::from_file(&config.dictionary)?;
        info!(
            path = %config.dictionary.display(),
            words = dictionary.len(),
            "dictionary loaded"
        );

        let listener = Listener::bind(config.port).map_err(|source| StartupError::Listen {
            port: config.port,
            source,
        })?;

        Ok(Self {
            config,
            listener,
            dictionary: Arc::new(dictionary),
        })
    }

    /// Address the server is listening on.
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the worker pool and the journal writer, then accepts
    /// connections forever, pushing each onto the connection queue.
    ///
    /// The connection queue holds as many connections as there are workers;
    /// while all workers are busy and the queue is full, this loop blocks in
    /// `push` and further clients wait in the OS accept backlog. Only a
    /// startup failure makes this function return.
    pub fn run(self) -> Result<(), StartupError> {
        let journal = Journal::create(&self.config.log).map_err(|source| StartupError::Journal {
            path: self.config.log.clone(),
            source,
        })?;

        let connections = Arc::new(BoundedQueue::new(self.config.workers));
        let records: Arc<BoundedQueue<Record>> = Arc::new(BoundedQueue::new(RECORD_QUEUE_CAPACITY));

        for id in 0..self.config.workers {
            let mut worker = Worker::new(
                connections.clone(),
                records.clone(),
                self.dictionary.clone(),
            );
            thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker.run())
                .map_err(|source| StartupError::Spawn {
                    name: format!("worker-{id}"),
                    source,
                })?;
        }

        let writer = JournalWriter::new(journal, records);
        thread::Builder::new()
            .name("journal".into())
            .spawn(move || writer.run())
            .map_err(|source| StartupError::Spawn {
                name: "journal".into(),
                source,
            })?;

        info!(
            port = self.config.port,
            workers = self.config.workers,
            "listening for connections"
        );

        loop {
            match self.listener.accept() {
                Ok(conn) => {
                    debug!(peer = %conn.peer_addr(), "accepted a new connection");
                    connections.push(conn);
                }
                Err(err) => warn!(%err, "accept failed"),
            }
        }
    }
}
