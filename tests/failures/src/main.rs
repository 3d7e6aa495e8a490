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

use crate::corruption::simulate_corruption;
use crate::duplication::simulate_duplication;
use crate::stall::run_simulate_stall;

mod corruption;
mod duplication;
mod stall;

fn main() {
    env_logger::init();

    let outcome = simulate_corruption(0.05);
    log::info!("Corruption:\n{}", outcome);

    let outcome = simulate_duplication(0.05, 300);
    log::info!("Duplication:\n{}", outcome);

    let outcome = run_simulate_stall(Some(200), 1000);
    log::info!("Stall:\n{}", outcome);
}
