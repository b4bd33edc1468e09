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

//! Dictionary index: a byte trie built once at startup and read by every
//! worker.
//!
//! Lookups are exact-match on bytes and case-sensitive. The structure is
//! frozen after build; workers share it behind an `Arc` with no further
//! synchronization.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The dictionary file could not be opened or read.
#[derive(Debug, Error)]
#[error("could not read dictionary {}: {source}", path.display())]
pub struct BuildError {
    /// Path of the dictionary file that failed to load.
    pub path: PathBuf,
    /// Underlying I/O failure.
    #[source]
    pub source: io::Error,
}

/// One trie node. The root's `byte` is unused; children are kept in
/// insertion order and scanned linearly.
#[derive(Debug)]
struct Node {
    byte: u8,
    terminal: bool,
    children: Vec<Node>,
}

impl Node {
    fn new(byte: u8) -> Self {
        Self {
            byte,
            terminal: false,
            children: Vec::new(),
        }
    }

    #[inline]
    fn child(&self, byte: u8) -> Option<&Node> {
        self.children.iter().find(|c| c.byte == byte)
    }
}

/// Set of known words, stored as a byte-keyed prefix tree.
///
/// A word is a member iff walking the tree byte-by-byte from the root lands
/// on a node whose terminal flag is set, so a word that is a prefix of
/// another is a member only if it was itself inserted.
#[derive(Debug)]
pub struct Dictionary {
    root: Node,
    words: usize,
}

impl Dictionary {
    /// Builds a dictionary from a newline-delimited word file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BuildError {
            path: path.to_owned(),
            source,
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|source| BuildError {
            path: path.to_owned(),
            source,
        })
    }

    /// Builds a dictionary from any byte source of newline-delimited words.
    ///
    /// Lines end with LF or CRLF; both terminators are stripped. Empty lines
    /// are skipped and duplicates are tolerated.
    pub fn from_reader<R: BufRead>(mut reader: R) -> io::Result<Self> {
        let mut dict = Self {
            root: Node::new(0),
            words: 0,
        };

        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                dict.insert(&line);
            }
        }

        Ok(dict)
    }

    fn insert(&mut self, word: &[u8]) {
        let mut node = &mut self.root;
        for &byte in word {
            let index = match node.children.iter().position(|c| c.byte == byte) {
                Some(index) => index,
                None => {
                    node.children.push(Node::new(byte));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }

        if !node.terminal {
            node.terminal = true;
            self.words += 1;
        }
    }

    /// Whether `word` was present in the loaded dictionary, byte for byte.
    pub fn contains(&self, word: &[u8]) -> bool {
        let mut node = &self.root;
        for &byte in word {
            match node.child(byte) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal
    }

    /// Number of distinct words in the dictionary.
    #[inline]
    pub fn len(&self) -> usize {
        self.words
    }

    /// Whether the dictionary holds no words.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words == 0
    }
}
