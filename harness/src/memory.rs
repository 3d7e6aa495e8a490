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

use std::collections::HashMap;

use crate::{replicate, Header, Transaction, BEAT_BYTES};

/// Sparse byte-addressed memory; bytes never written read as zero.
#[derive(Debug, Default)]
pub struct Memory {
    bytes: HashMap<u64, u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte(&self, addr: u64) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    /// Applies a write transaction. Each byte is taken from its lane of the
    /// beat that covers it.
    pub fn write(&mut self, tx: &Transaction) {
        let span = std::cmp::min(tx.header.bytes(), BEAT_BYTES);
        for (addr, word) in tx.beat_words() {
            for a in addr..addr + span {
                self.bytes.insert(a, lane(word, a));
            }
        }
    }

    /// Contents covered by `header`, one word per beat in block address
    /// order. Sub-beat reads are replicated across the word.
    pub fn read(&self, header: &Header) -> Vec<u64> {
        if header.bytes() < BEAT_BYTES {
            let value = (0..header.bytes()).fold(0u64, |value, i| {
                value | (self.byte(header.addr + i) as u64) << (8 * i)
            });
            return vec![replicate(value, header.size)];
        }
        let base = if header.beat_count() == 1 {
            header.addr
        } else {
            header.block_base()
        };
        (0..header.beat_count() as u64)
            .map(|k| self.word(base + k * BEAT_BYTES))
            .collect()
    }

    fn word(&self, addr: u64) -> u64 {
        (0..BEAT_BYTES).fold(0u64, |word, i| {
            word | (self.byte(addr + i) as u64) << (8 * ((addr + i) % BEAT_BYTES))
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Byte of `word` on the lane addressed by `addr`.
pub(crate) fn lane(word: u64, addr: u64) -> u8 {
    (word >> (8 * (addr % BEAT_BYTES))) as u8
}
