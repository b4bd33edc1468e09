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

#![deny(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unused_imports
)]
// Disallow warnings in examples.
#![doc(test(attr(deny(warnings))))]

//! spelld is a concurrent, line-oriented spell-check server intended for
//! personal learning purposes.
//!
//! Clients open a TCP connection and send one word per line; for each
//! non-empty line the server answers `<word> OK` or `<word> MISSPELLED`
//! against a dictionary loaded once at startup. A fixed pool of worker
//! threads serves clients, handed off through a bounded queue that applies
//! backpressure to the accept path, and every verdict is journaled through a
//! second bounded queue to an append-only log file.

pub mod config;
pub mod connection;
pub mod dict;
pub mod journal;
pub mod listener;
pub mod queue;
pub mod server;
pub mod worker;
