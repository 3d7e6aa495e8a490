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

use env_logger::Target;
use structopt::StructOpt;

use harness::HarnessConfig;

mod modes;
use modes::CheckMode;

#[derive(StructOpt)]
#[structopt(
    name = "bridge-check",
    about = "Random command/response traffic through a BedRock bridge"
)]
struct Arguments {
    /// YAML harness configuration; flags below override it
    #[structopt(short, long)]
    config: Option<String>,
    /// supported modes: Loopback, Ram
    #[structopt(short, long, default_value = "Loopback")]
    mode: CheckMode,
    /// number of transactions
    #[structopt(short, long)]
    test_size: Option<usize>,
    /// seed for all random streams; random if absent
    #[structopt(short, long)]
    seed: Option<u64>,
    /// probability a beat gets one bit flipped in the bridge
    #[structopt(long)]
    corruption_rate: Option<f64>,
}

fn build_config(args: &Arguments) -> anyhow::Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(file_name) => HarnessConfig::from_file(file_name)?,
        None => HarnessConfig::default(),
    };
    args.mode.apply(&mut config);
    if let Some(test_size) = args.test_size {
        config.test_size = test_size;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(rate) = args.corruption_rate {
        config.bridge.corruption_rate = rate;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::from_args();

    env_logger::builder()
        .filter(Some("harness"), log::LevelFilter::Info)
        .target(Target::Stderr)
        .parse_default_env()
        .init();

    let config = build_config(&args)?;
    log::info!(
        "checking {} transactions, seed {} ({:?})",
        config.test_size,
        config.seed,
        args.mode
    );
    let outcome = harness::simulate_loopback(&config);
    println!("{}", outcome);
    if !outcome.passed() {
        log::error!("rerun with --seed {} to reproduce", config.seed);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let path = format!("{}/configs/ram.yaml", env!("CARGO_MANIFEST_DIR"));
        let args = Arguments::from_iter(vec![
            "bridge_check",
            "--config",
            path.as_str(),
            "--mode",
            "Ram",
            "--seed",
            "7",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.test_size, 5000);
        assert_eq!(config.seed, 7);
        assert_eq!(config.bridge.latency, 2);
        assert_eq!(config.client.response_data, harness::ResponseData::Memory);
    }
}
