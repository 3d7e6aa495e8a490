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

use std::str::FromStr;
use structopt::StructOpt;

use harness::{HarnessConfig, ResponseData};

// Loopback answers reads with random data.
// Ram answers reads from what earlier writes stored and checks them against
// a shadow memory.
#[derive(StructOpt, Debug, PartialEq)]
pub enum CheckMode {
    Loopback,
    Ram,
}

impl CheckMode {
    pub fn apply(&self, config: &mut HarnessConfig) {
        config.client.response_data = match self {
            CheckMode::Loopback => ResponseData::Random,
            CheckMode::Ram => ResponseData::Memory,
        };
    }
}

impl FromStr for CheckMode {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Loopback" => Ok(CheckMode::Loopback),
            "Ram" => Ok(CheckMode::Ram),
            _ => Err(Self::Err::new(
                std::io::ErrorKind::Other,
                format!("Invalid check mode: {}", s),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modes() {
        assert_eq!("Ram".parse::<CheckMode>().unwrap(), CheckMode::Ram);
        assert!("ram".parse::<CheckMode>().is_err());
        let mut config = HarnessConfig::default();
        CheckMode::Ram.apply(&mut config);
        assert_eq!(config.client.response_data, ResponseData::Memory);
    }
}
