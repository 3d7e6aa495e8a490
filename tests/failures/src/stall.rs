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

//! Test that a bridge which stops moving beats is reported by the liveness
//! monitor.

use harness::{BridgeConfig, Cycle, HarnessConfig, Outcome, RunLimits};

pub fn run_simulate_stall(induced_stall: Option<Cycle>, stall_rounds: Cycle) -> Outcome {
    let config = HarnessConfig {
        test_size: 100,
        seed: 0x57A11,
        bridge: BridgeConfig {
            induced_stall,
            ..Default::default()
        },
        run: RunLimits {
            stall_rounds,
            ..Default::default()
        },
        ..Default::default()
    };
    harness::simulate_loopback(&config)
}

#[cfg(test)]
mod tests {
    use crate::stall::run_simulate_stall;
    use harness::Error;

    #[test]
    fn test_bridge_stall() {
        let _ = env_logger::try_init();
        // stall long after the run is over
        let outcome = run_simulate_stall(Some(1_000_000), 1000);
        assert!(outcome.passed(), "{}", outcome);

        let outcome = run_simulate_stall(Some(200), 1000);
        log::info!("Stall at 200:\n{}", outcome);
        match outcome.fatal {
            Some(Error::NoProgress {
                round,
                progress,
                test_size,
            }) => {
                assert!(round >= 1000);
                assert!(progress < test_size);
            }
            other => panic!("expected a liveness failure, got {:?}", other),
        }

        let outcome = run_simulate_stall(Some(0), 50);
        assert_eq!(
            outcome.fatal,
            Some(Error::NoProgress {
                round: 50,
                progress: 0,
                test_size: 100
            })
        );
    }
}
