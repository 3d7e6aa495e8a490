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

//! Test that bit flips injected by the bridge show up as data mismatches
//! and never as protocol violations.

use harness::{BridgeConfig, HarnessConfig, Outcome};

pub fn simulate_corruption(corruption_rate: f64) -> Outcome {
    let config = HarnessConfig {
        test_size: 300,
        seed: 0x5EED,
        bridge: BridgeConfig {
            corruption_rate,
            // Note: default RNG behavior is deterministic.
            ..Default::default()
        },
        ..Default::default()
    };
    harness::simulate_loopback(&config)
}

#[cfg(test)]
mod tests {
    use crate::corruption::simulate_corruption;
    use harness::{Link, Mismatch};

    #[test]
    fn test_beat_corruption() {
        // Sanity check, with 0 corruption, nothing is reported.
        let _ = env_logger::try_init();
        let outcome = simulate_corruption(0.0);
        log::info!("No corruption:\n{}", outcome);
        assert!(outcome.passed());

        // Only data bits are flipped, so the run still completes; every write
        // command and read response hit is caught by the comparator, while
        // hits on read commands and write acks carry no checked data.
        let outcome = simulate_corruption(0.05);
        log::info!("Corruption 0.05:\n{}", outcome);
        assert!(outcome.fatal.is_none());
        assert!(!outcome.passed());
        assert!(outcome.report.mismatch_count() > 0);
        assert!(outcome.report.mismatches().len() <= 3);
        assert!(outcome
            .report
            .mismatches()
            .iter()
            .all(|m| matches!(m, Mismatch::Data { .. })));

        // Every beat corrupted.
        let outcome = simulate_corruption(1.0);
        assert!(outcome.fatal.is_none());
        let on_commands = outcome.report.mismatches().iter().any(|m| {
            matches!(
                m,
                Mismatch::Data {
                    link: Link::Command,
                    ..
                }
            )
        });
        assert!(on_commands);
        assert!(outcome.report.mismatch_count() > 300);
    }
}
