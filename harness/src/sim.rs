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

//! The round scheduler.
//!
//! Every round has two phases. In the stimulus phase the master, the client
//! and the bridge each compute what they drive from their own state only.
//! The outputs are merged into one `Signals` snapshot, and in the
//! observation phase every party updates its state from that snapshot. No
//! party sees another's state change before the next round.

use log::{debug, info};
use std::fmt;

use crate::bridge::{LoopbackBridge, Transport};
use crate::config::{HarnessConfig, RunLimits};
use crate::signals::{BridgeDrive, Clocked, Signals};
use crate::{compare, Client, Cycle, Error, Master, MemoryScoreboard, Report, Traces};

/// The device between the two endpoints.
pub trait Bridge: Clocked<Drive = BridgeDrive, Observe = Signals> {
    /// Beats accepted but not yet delivered.
    fn in_flight(&self) -> usize;
}

impl<T: Transport> Bridge for LoopbackBridge<T> {
    fn in_flight(&self) -> usize {
        LoopbackBridge::in_flight(self)
    }
}

pub struct Simulation<B: Bridge> {
    master: Master,
    client: Client,
    bridge: B,
    round: Cycle,
}

impl<B: Bridge> Simulation<B> {
    pub fn new(master: Master, client: Client, bridge: B) -> Self {
        Self {
            master,
            client,
            bridge,
            round: 0,
        }
    }

    /// Runs one round and returns the signals of that round.
    pub fn step(&mut self) -> Result<Signals, Error> {
        let signals = Signals::merge(
            self.master.drive(),
            self.client.drive(),
            self.bridge.drive(),
        );
        self.master.observe(&signals.master)?;
        self.client.observe(&signals.client)?;
        self.bridge.observe(&signals)?;
        self.round += 1;
        Ok(signals)
    }

    /// Both endpoints are finished and nothing is left in the bridge.
    pub fn is_done(&self) -> bool {
        self.master.is_done() && self.client.is_done() && self.bridge.in_flight() == 0
    }

    /// Steps until done. Fails if `max_rounds` elapse, or if neither
    /// endpoint completes a transaction for `stall_rounds` rounds.
    pub fn run(&mut self, limits: &RunLimits) -> Result<Cycle, Error> {
        let test_size = self.master.test_size();
        let report_every = std::cmp::max(1, test_size / 10);
        let mut next_report = report_every;
        let mut activity = self.activity();
        let mut last_change = self.round;
        while !self.is_done() {
            if self.round >= limits.max_rounds || self.round - last_change >= limits.stall_rounds {
                return Err(Error::NoProgress {
                    round: self.round,
                    progress: self.master.progress(),
                    test_size,
                });
            }
            self.step()?;
            if self.activity() != activity {
                activity = self.activity();
                last_change = self.round;
            }
            if self.master.progress() >= next_report {
                info!(
                    "round {}: {}/{} transactions complete",
                    self.round,
                    self.master.progress(),
                    test_size
                );
                next_report += report_every;
            }
        }
        debug!("done after {} rounds", self.round);
        Ok(self.round)
    }

    fn activity(&self) -> usize {
        self.master.progress() + self.client.progress()
    }

    /// Runs to completion and verifies the traces.
    pub fn check(&mut self, limits: &RunLimits, error_cap: usize) -> Outcome {
        let fatal = self.run(limits).err();
        let test_size = self.master.test_size();
        let (report, memory) = if fatal.is_none() {
            let report = compare(&self.traces(), test_size, error_cap);
            let memory = self.client.memory().map(|_| {
                MemoryScoreboard::replay(
                    self.master.sent_trace(),
                    self.master.received_trace(),
                    error_cap,
                )
            });
            (report, memory)
        } else {
            (Report::new(error_cap), None)
        };
        Outcome {
            test_size,
            rounds: self.round,
            fatal,
            report,
            memory,
        }
    }

    pub fn traces(&self) -> Traces<'_> {
        Traces {
            sent_commands: self.master.sent_trace(),
            received_commands: self.client.received_trace(),
            sent_responses: self.client.sent_trace(),
            received_responses: self.master.received_trace(),
        }
    }

    pub fn round(&self) -> Cycle {
        self.round
    }

    pub fn master(&self) -> &Master {
        &self.master
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }
}

/// Result of a checked run.
#[derive(Debug)]
pub struct Outcome {
    pub test_size: usize,
    pub rounds: Cycle,
    /// protocol violation or liveness failure that stopped the run
    pub fatal: Option<Error>,
    pub report: Report,
    /// shadow memory check, when the client answered from memory
    pub memory: Option<Report>,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.fatal.is_none()
            && self.report.passed()
            && self.memory.as_ref().map_or(true, Report::passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SUMMARY: {} transactions in {} rounds",
            self.test_size, self.rounds
        )?;
        if let Some(error) = &self.fatal {
            writeln!(f, "{}", error)?;
        } else {
            writeln!(f, "traces: {}", self.report)?;
            if let Some(memory) = &self.memory {
                writeln!(f, "memory: {}", memory)?;
            }
        }
        write!(f, "{}", if self.passed() { "PASS" } else { "FAIL" })
    }
}

/// Runs `config.test_size` random transactions through a loopback bridge
/// and checks the result.
pub fn simulate_loopback(config: &HarnessConfig) -> Outcome {
    info!("seed: {}", config.seed);
    let master = match Master::new(&config.master, config.test_size, config.seed) {
        Ok(master) => master,
        Err(e) => {
            return Outcome {
                test_size: config.test_size,
                rounds: 0,
                fatal: Some(e),
                report: Report::new(config.error_cap),
                memory: None,
            }
        }
    };
    let client = Client::new(&config.client, config.test_size, config.seed);
    let bridge = LoopbackBridge::new(&config.bridge);
    Simulation::new(master, client, bridge).check(&config.run, config.error_cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    fn config(seed: u64) -> HarnessConfig {
        HarnessConfig {
            test_size: 200,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn loopback_passes() {
        let _ = env_logger::builder().is_test(true).try_init();
        let outcome = simulate_loopback(&config(17));
        assert!(outcome.passed(), "{}", outcome);
        assert!(outcome.to_string().ends_with("PASS"));
    }

    #[test]
    fn stalled_bridge_reports_no_progress() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = HarnessConfig {
            bridge: BridgeConfig {
                induced_stall: Some(50),
                ..Default::default()
            },
            run: RunLimits {
                max_rounds: 100_000,
                stall_rounds: 500,
            },
            ..config(3)
        };
        let outcome = simulate_loopback(&config);
        assert!(matches!(outcome.fatal, Some(Error::NoProgress { .. })));
        assert!(!outcome.passed());
    }

    #[test]
    fn invalid_size_range_fails_without_running() {
        let mut config = config(5);
        config.master.generator.max_size = 7;
        let outcome = simulate_loopback(&config);
        assert_eq!(outcome.fatal, Some(Error::InvalidSize(7)));
        assert_eq!(outcome.rounds, 0);
        assert!(outcome.to_string().ends_with("FAIL"));
    }

    #[test]
    fn round_budget_is_enforced() {
        let master = Master::new(&Default::default(), 10, 1).unwrap();
        let client = Client::new(&Default::default(), 10, 1);
        let bridge = LoopbackBridge::new(&Default::default());
        let mut sim = Simulation::new(master, client, bridge);
        let limits = RunLimits {
            max_rounds: 3,
            stall_rounds: 1000,
        };
        assert_eq!(
            sim.run(&limits),
            Err(Error::NoProgress {
                round: 3,
                progress: 0,
                test_size: 10
            })
        );
    }
}
