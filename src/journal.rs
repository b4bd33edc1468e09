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

//! Append-only journal of spell-check verdicts, drained by a single thread.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::queue::BoundedQueue;

/// One journal entry: `WORD OK` or `WORD MISSPELLED`, without the LF.
///
/// Records are freshly allocated by the worker that classified the word;
/// pushing one onto the record queue transfers its ownership to the journal
/// writer.
pub type Record = Vec<u8>;

/// Journal file, truncated when opened.
#[derive(Debug)]
pub struct Journal {
    out: BufWriter<File>,
}

impl Journal {
    /// Opens `path` for writing, discarding any previous contents.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
        })
    }

    /// Appends one record followed by LF and flushes it to the file.
    pub fn append(&mut self, record: &[u8]) -> io::Result<()> {
        self.out.write_all(record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Long-lived task that drains the record queue into the journal.
#[derive(Debug)]
pub struct JournalWriter {
    journal: Journal,
    records: Arc<BoundedQueue<Record>>,
}

impl JournalWriter {
    /// Creates a writer draining `records` into `journal`.
    pub fn new(journal: Journal, records: Arc<BoundedQueue<Record>>) -> Self {
        Self { journal, records }
    }

    /// Main loop of the journal writer. Each record is flushed before the
    /// next one is popped; write failures are logged and otherwise ignored.
    pub fn run(mut self) {
        loop {
            let record = self.records.pop();
            if let Err(err) = self.journal.append(&record) {
                warn!(%err, "journal write failed");
            }
        }
    }
}
