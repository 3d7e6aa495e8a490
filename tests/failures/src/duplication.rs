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

//! Test that a bridge delivering a response twice stops the run instead of
//! being silently absorbed.

use harness::{BridgeConfig, GeneratorConfig, HarnessConfig, MasterConfig, Outcome};

// Single-beat transactions only, so every duplicated beat is a whole extra
// response.
pub fn simulate_duplication(duplication_rate: f64, test_size: usize) -> Outcome {
    let config = HarnessConfig {
        test_size,
        seed: 0xD0D0,
        master: MasterConfig {
            generator: GeneratorConfig {
                max_size: 3,
                ..Default::default()
            },
            ..Default::default()
        },
        bridge: BridgeConfig {
            duplication_rate,
            ..Default::default()
        },
        ..Default::default()
    };
    harness::simulate_loopback(&config)
}

#[cfg(test)]
mod tests {
    use crate::duplication::simulate_duplication;
    use harness::Error;

    #[test]
    fn test_response_duplication() {
        let _ = env_logger::try_init();
        let outcome = simulate_duplication(0.0, 300);
        assert!(outcome.passed(), "{}", outcome);

        let outcome = simulate_duplication(0.05, 300);
        log::info!("Duplication 0.05:\n{}", outcome);
        assert_eq!(
            outcome.fatal,
            Some(Error::TooManyResponses { test_size: 300 })
        );
        assert!(!outcome.passed());

        // the first response is delivered over and over
        let outcome = simulate_duplication(1.0, 10);
        assert_eq!(outcome.fatal, Some(Error::TooManyResponses { test_size: 10 }));
    }
}
