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

//! Runtime configuration and command-line parsing.

use std::path::PathBuf;

use clap::Parser;

/// Default TCP port to listen on.
pub const DEFAULT_PORT: u16 = 2667;
/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 4;
/// Default dictionary file.
pub const DEFAULT_DICTIONARY: &str = "words";
/// Journal file, created in the working directory and truncated at startup.
pub const LOG_FILE: &str = "log.txt";

#[derive(Debug, Parser)]
#[command(name = "spelld", about = "Concurrent line-oriented spell-check server")]
struct Args {
    /// TCP port to listen for incoming connections on.
    #[arg(short = 'p', value_name = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Number of worker threads to spawn. This also serves as an upper bound
    /// on the number of simultaneously served clients.
    #[arg(
        short = 't',
        value_name = "COUNT",
        default_value_t = DEFAULT_WORKERS as i64,
        allow_negative_numbers = true
    )]
    threads: i64,

    /// Dictionary file to use, one word per line.
    #[arg(short = 'd', value_name = "FILE", default_value = DEFAULT_DICTIONARY)]
    dictionary: PathBuf,
}

/// Immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the server listens on.
    pub port: u16,
    /// Number of worker threads; also the connection queue capacity.
    pub workers: usize,
    /// Path of the newline-delimited dictionary file.
    pub dictionary: PathBuf,
    /// Path of the journal file, truncated at startup.
    pub log: PathBuf,
}

impl Config {
    /// Parses the command line.
    ///
    /// A missing value after a flag or an unknown token prints the usage
    /// block and exits nonzero.
    pub fn parse() -> Self {
        Args::parse().into()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            dictionary: PathBuf::from(DEFAULT_DICTIONARY),
            log: PathBuf::from(LOG_FILE),
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            // port 0 and worker counts below 1 revert to the defaults
            port: if args.port == 0 { DEFAULT_PORT } else { args.port },
            workers: if args.threads < 1 {
                DEFAULT_WORKERS
            } else {
                args.threads as usize
            },
            dictionary: args.dictionary,
            log: PathBuf::from(LOG_FILE),
        }
    }
}
