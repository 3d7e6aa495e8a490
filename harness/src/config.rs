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

//! Harness parameters, constructed programmatically or read from YAML.

use anyhow::{ensure, Context};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::packet::{MsgType, ADDR_MASK, MAX_SIZE};
use crate::Cycle;

/// Upper bound (exclusive) of the random cooldowns.
pub const COOLDOWN_LIMIT: usize = 8;

/// Number of mismatches reported before the report goes quiet.
pub const ERROR_CAP: usize = 3;

/// How the generator chooses opcodes.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Opcodes {
    Uncached,
    Cached,
    /// cached opcodes at or above `cached_base`, uncached below
    AddressMapped { cached_base: u64 },
}

impl Opcodes {
    pub fn msg_type(&self, addr: u64, write: bool) -> MsgType {
        let cached = match self {
            Self::Uncached => false,
            Self::Cached => true,
            Self::AddressMapped { cached_base } => addr >= *cached_base,
        };
        match (cached, write) {
            (false, false) => MsgType::UncachedRead,
            (false, true) => MsgType::UncachedWrite,
            (true, false) => MsgType::Read,
            (true, true) => MsgType::Write,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub min_size: u8,
    pub max_size: u8,
    /// align multi-beat transfers to a beat only, so they start mid-block
    pub critical_word_first: bool,
    pub opcodes: Opcodes,
    /// randomize subop and payload
    pub randomize_aux: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: MAX_SIZE,
            critical_word_first: true,
            opcodes: Opcodes::Uncached,
            randomize_aux: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MasterConfig {
    pub cooldown_limit: usize,
    pub generator: GeneratorConfig,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            cooldown_limit: COOLDOWN_LIMIT,
            generator: GeneratorConfig::default(),
        }
    }
}

/// Where the client gets read data from.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseData {
    Random,
    /// behave as a RAM: writes stick, reads return what was written
    Memory,
}

/// What a write acknowledgement carries.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteAck {
    Random,
    /// first data word of the write
    Echo,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub cooldown_limit: usize,
    pub response_data: ResponseData,
    pub write_ack: WriteAck,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cooldown_limit: COOLDOWN_LIMIT,
            response_data: ResponseData::Random,
            write_ack: WriteAck::Random,
        }
    }
}

/// Parameters of the reference loopback bridge.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// beats each direction can hold
    pub capacity: usize,
    /// rounds a beat spends on the link
    pub latency: Cycle,
    pub corruption_rate: f64,
    pub duplication_rate: f64,
    /// round after which the bridge stops moving beats
    pub induced_stall: Option<Cycle>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            latency: 1,
            corruption_rate: 0.0,
            duplication_rate: 0.0,
            induced_stall: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunLimits {
    pub max_rounds: Cycle,
    /// rounds without a completed transaction before giving up
    pub stall_rounds: Cycle,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_rounds: 10_000_000,
            stall_rounds: 10_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    pub test_size: usize,
    pub seed: u64,
    pub master: MasterConfig,
    pub client: ClientConfig,
    pub bridge: BridgeConfig,
    pub run: RunLimits,
    pub error_cap: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_size: 1000,
            seed: rand::thread_rng().gen(),
            master: MasterConfig::default(),
            client: ClientConfig::default(),
            bridge: BridgeConfig::default(),
            run: RunLimits::default(),
            error_cap: ERROR_CAP,
        }
    }
}

impl HarnessConfig {
    pub fn from_file(file_name: &str) -> anyhow::Result<Self> {
        let file = File::open(Path::new(file_name))
            .with_context(|| format!("opening config {}", file_name))?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)
            .with_context(|| format!("parsing config {}", file_name))?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(config: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let generator = &self.master.generator;
        ensure!(
            generator.min_size <= generator.max_size && generator.max_size <= MAX_SIZE,
            "sizes must satisfy min_size <= max_size <= {}",
            MAX_SIZE
        );
        if let Opcodes::AddressMapped { cached_base } = generator.opcodes {
            ensure!(
                cached_base <= ADDR_MASK,
                "cached_base {:#x} outside the address space",
                cached_base
            );
        }
        ensure!(self.bridge.capacity > 0, "bridge capacity must be positive");
        for (name, rate) in [
            ("corruption_rate", self.bridge.corruption_rate),
            ("duplication_rate", self.bridge.duplication_rate),
        ] {
            ensure!((0.0..=1.0).contains(&rate), "{} must be in [0, 1]", name);
        }
        ensure!(self.run.stall_rounds > 0, "stall_rounds must be positive");
        ensure!(self.error_cap > 0, "error_cap must be positive");
        Ok(())
    }
}
