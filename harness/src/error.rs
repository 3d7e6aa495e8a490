// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

use crate::Cycle;

/// Fatal conditions. Any of these stops the simulation immediately; data
/// mismatches are not errors, they are collected in a `Report`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    InvalidMsgType(u8),
    InvalidSize(u8),
    AddressOutOfRange(u64),
    MisalignedAddress { addr: u64, size: u8 },
    DataLength { expected: usize, actual: usize },
    TooManyCommands { test_size: usize },
    TooManyResponses { test_size: usize },
    HandshakeWithoutPending(&'static str),
    LinkOverflow(&'static str),
    NoProgress {
        round: Cycle,
        progress: usize,
        test_size: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MisalignedAddress { addr, size } => {
                write!(
                    f,
                    "ERROR: Address {:#012x} is not aligned for size {}",
                    addr, size
                )
            }
            Self::TooManyCommands { test_size } => {
                write!(
                    f,
                    "ERROR: Client adapter received more than {} commands",
                    test_size
                )
            }
            Self::TooManyResponses { test_size } => {
                write!(
                    f,
                    "ERROR: Master adapter received more than {} responses",
                    test_size
                )
            }
            Self::HandshakeWithoutPending(channel) => {
                write!(
                    f,
                    "ERROR: Handshake completed on the {} channel with nothing queued",
                    channel
                )
            }
            Self::NoProgress {
                round,
                progress,
                test_size,
            } => {
                write!(
                    f,
                    "ERROR: No progress at round {}: {}/{} responses received",
                    round, progress, test_size
                )
            }
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}
