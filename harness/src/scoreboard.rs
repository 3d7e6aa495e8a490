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

use itertools::Itertools;

use crate::compare::{Link, Mismatch, Report, Trace};
use crate::{Memory, Transaction};

/// Checks read data against a shadow memory fed by the master's writes.
///
/// Only meaningful when the client answers from memory; with random read
/// data nearly every read mismatches.
pub struct MemoryScoreboard {
    memory: Memory,
    report: Report,
}

impl MemoryScoreboard {
    pub fn new(error_cap: usize) -> Self {
        Self {
            memory: Memory::new(),
            report: Report::new(error_cap),
        }
    }

    /// Replays `commands` in issue order, each against its response.
    pub fn replay(commands: &[Transaction], responses: &[Transaction], error_cap: usize) -> Report {
        let mut scoreboard = Self::new(error_cap);
        if commands.len() != responses.len() {
            scoreboard.report.record(Mismatch::Count {
                trace: Trace::ReceivedResponses,
                expected: commands.len(),
                actual: responses.len(),
            });
            return scoreboard.into_report();
        }
        for (index, (command, response)) in commands.iter().zip_eq(responses).enumerate() {
            scoreboard.check(index, command, response);
        }
        scoreboard.into_report()
    }

    pub fn check(&mut self, index: usize, command: &Transaction, response: &Transaction) {
        let header = command.header;
        if header != response.header {
            self.report.record(Mismatch::Header {
                link: Link::Memory,
                index,
                expected: header,
                actual: response.header,
            });
            return;
        }
        if header.msg_type.is_write() {
            self.memory.write(command);
            return;
        }
        let expected = self.memory.read(&header);
        if response.data.len() != expected.len() {
            self.report.record(Mismatch::BeatCount {
                link: Link::Memory,
                index,
                expected: expected.len(),
                actual: response.data.len(),
            });
            return;
        }
        let block = header.block_base()..header.block_base() + header.bytes();
        for (beat, (addr, actual)) in response.beat_words().into_iter().enumerate() {
            if expected.len() > 1 && !block.contains(&addr) {
                self.report.record(Mismatch::BeatAddress {
                    link: Link::Memory,
                    index,
                    beat,
                    expected: header.beat_addr(beat),
                    actual: addr,
                });
                continue;
            }
            let want = expected[header.word_index(addr)];
            if want != actual {
                self.report.record(Mismatch::Data {
                    link: Link::Memory,
                    index,
                    header,
                    beat,
                    expected: want,
                    actual,
                });
            }
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn into_report(self) -> Report {
        self.report
    }
}
