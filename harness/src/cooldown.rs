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

use rand::Rng;

/// Randomized countdown gating a valid or ready signal.
///
/// The gated signal may be asserted only in rounds where the countdown has
/// reached zero. After every completed transaction the owner resamples it
/// uniformly from `[0, limit)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cooldown {
    remaining: usize,
    limit: usize,
}

impl Cooldown {
    pub fn new(limit: usize) -> Self {
        Self {
            remaining: 0,
            limit,
        }
    }

    pub fn expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Counts down one round.
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.remaining = if self.limit > 1 {
            rng.gen_range(0..self.limit)
        } else {
            0
        };
    }
}
