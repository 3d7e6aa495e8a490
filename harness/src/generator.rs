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

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::config::GeneratorConfig;
use crate::packet::{PAYLOAD_MASK, SUBOP_MASK};
use crate::{replicate, Error, Header, Transaction, ADDR_MASK, BEAT_BYTES, MAX_SIZE};

/// Endless stream of random, well-formed transactions.
pub struct Generator {
    config: GeneratorConfig,
    rng: Xoshiro256StarStar,
}

impl Generator {
    pub fn new(config: &GeneratorConfig, seed: u64) -> Result<Self, Error> {
        Self::from_rng(config, Xoshiro256StarStar::seed_from_u64(seed))
    }

    /// Fails with `InvalidSize` unless `min_size <= max_size <= MAX_SIZE`.
    pub fn from_rng(config: &GeneratorConfig, rng: Xoshiro256StarStar) -> Result<Self, Error> {
        if config.max_size > MAX_SIZE {
            return Err(Error::InvalidSize(config.max_size));
        }
        if config.min_size > config.max_size {
            return Err(Error::InvalidSize(config.min_size));
        }
        Ok(Self {
            config: config.clone(),
            rng,
        })
    }

    fn random_addr(&mut self, size: u8) -> u64 {
        let bytes = 1u64 << size;
        let align = if self.config.critical_word_first {
            std::cmp::min(bytes, BEAT_BYTES)
        } else {
            bytes
        };
        self.rng.gen::<u64>() & ADDR_MASK & !(align - 1)
    }
}

impl Iterator for Generator {
    type Item = Transaction;

    fn next(&mut self) -> Option<Transaction> {
        let size = self.rng.gen_range(self.config.min_size..=self.config.max_size);
        let addr = self.random_addr(size);
        let write = self.rng.gen_bool(0.5);
        let msg_type = self.config.opcodes.msg_type(addr, write);
        let (subop, payload) = if self.config.randomize_aux {
            (
                self.rng.gen::<u8>() & SUBOP_MASK,
                self.rng.gen::<u16>() & PAYLOAD_MASK,
            )
        } else {
            (0, 0)
        };
        let header = Header {
            msg_type,
            subop,
            addr,
            size,
            payload,
        };
        let data = if write {
            (0..header.beat_count())
                .map(|_| replicate(self.rng.gen(), size))
                .collect()
        } else {
            Vec::new()
        };
        Some(Transaction::new(header, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Opcodes;

    #[test]
    fn transactions_are_well_formed() {
        let config = GeneratorConfig::default();
        for tx in Generator::new(&config, 0xC0FFEE).unwrap().take(2000) {
            tx.validate().unwrap();
            if tx.header.msg_type.is_write() {
                assert_eq!(tx.data.len(), tx.header.beat_count());
                for word in tx.data.iter() {
                    assert_eq!(*word, replicate(*word, tx.header.size));
                }
            } else {
                assert!(tx.data.is_empty());
            }
            assert!(!tx.header.msg_type.is_cached());
        }
    }

    #[test]
    fn same_seed_same_trace() {
        let config = GeneratorConfig::default();
        let a = Generator::new(&config, 5).unwrap().take(100).collect::<Vec<_>>();
        let b = Generator::new(&config, 5).unwrap().take(100).collect::<Vec<_>>();
        let c = Generator::new(&config, 6).unwrap().take(100).collect::<Vec<_>>();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn full_alignment_without_critical_word_first() {
        let config = GeneratorConfig {
            min_size: 4,
            critical_word_first: false,
            randomize_aux: false,
            ..Default::default()
        };
        for tx in Generator::new(&config, 9).unwrap().take(500) {
            assert_eq!(tx.header.addr, tx.header.block_base());
            assert_eq!(tx.header.subop, 0);
            assert_eq!(tx.header.payload, 0);
        }
    }

    #[test]
    fn address_mapped_opcodes() {
        let config = GeneratorConfig {
            opcodes: Opcodes::AddressMapped {
                cached_base: 0x80_0000_0000,
            },
            ..Default::default()
        };
        let mut cached = 0;
        for tx in Generator::new(&config, 11).unwrap().take(1000) {
            assert_eq!(tx.header.msg_type.is_cached(), tx.header.addr >= 0x80_0000_0000);
            cached += tx.header.msg_type.is_cached() as usize;
        }
        assert!(cached > 0 && cached < 1000);
    }

    #[test]
    fn invalid_size_range_is_an_error() {
        let too_large = GeneratorConfig {
            max_size: 7,
            ..Default::default()
        };
        assert_eq!(
            Generator::new(&too_large, 1).err(),
            Some(Error::InvalidSize(7))
        );
        let inverted = GeneratorConfig {
            min_size: 5,
            max_size: 2,
            ..Default::default()
        };
        assert_eq!(
            Generator::new(&inverted, 1).err(),
            Some(Error::InvalidSize(5))
        );
    }
}
