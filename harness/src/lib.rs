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

//! Randomized verification of a BedRock command/response bridge.
//!
//! A master endpoint drives a pre-generated trace of commands into the
//! bridge, a client endpoint answers every command it receives, and once
//! the master has collected all responses the four traces are compared
//! against each other.

mod beats;
mod bridge;
mod client;
mod compare;
pub mod config;
mod cooldown;
mod error;
mod generator;
mod master;
mod memory;
mod packet;
mod scoreboard;
mod signals;
mod sim;

// type to use for simulation rounds
pub type Cycle = usize;

pub use crate::beats::{beat_of, split, Joiner, Splitter};
pub use crate::bridge::{FailureProperties, LinkBuffer, LoopbackBridge, Transport};
pub use crate::client::Client;
pub use crate::compare::{compare, Link, Mismatch, Report, Trace, Traces};
pub use crate::config::{
    BridgeConfig, ClientConfig, GeneratorConfig, HarnessConfig, MasterConfig, Opcodes,
    ResponseData, RunLimits, WriteAck,
};
pub use crate::cooldown::Cooldown;
pub use crate::error::Error;
pub use crate::generator::Generator;
pub use crate::master::Master;
pub use crate::memory::Memory;
pub use crate::packet::{replicate, Beat, Header, MsgType, Transaction};
pub use crate::packet::{ADDR_MASK, ADDR_WIDTH, BEAT_BYTES, BEAT_WIDTH, MAX_SIZE};
pub use crate::scoreboard::MemoryScoreboard;
pub use crate::signals::{BridgeDrive, Channel, ClientDrive, Clocked, MasterDrive, Port, Signals};
pub use crate::sim::{simulate_loopback, Bridge, Outcome, Simulation};
