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

//! Post-run comparison of the four traces.
//!
//! Transactions are matched by position: the n-th command the client
//! received against the n-th command the master sent, and likewise for
//! responses. Received transactions carry their data in wire order, so the
//! expected side is permuted with `Transaction::wire_order_data` before the
//! data words are compared.

use itertools::Itertools;
use log::error;
use std::fmt;

use crate::{Header, Transaction};

/// The four traces of one run.
#[derive(Clone, Copy, Debug)]
pub struct Traces<'a> {
    /// issued by the master
    pub sent_commands: &'a [Transaction],
    /// reassembled by the client
    pub received_commands: &'a [Transaction],
    /// issued by the client
    pub sent_responses: &'a [Transaction],
    /// reassembled by the master
    pub received_responses: &'a [Transaction],
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Trace {
    SentCommands,
    ReceivedCommands,
    SentResponses,
    ReceivedResponses,
}

/// Which pair of traces a mismatch was found between.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Link {
    /// master command vs client command
    Command,
    /// client response vs master response
    Response,
    /// master command vs master response
    Echo,
    /// master response vs shadow memory
    Memory,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mismatch {
    Count {
        trace: Trace,
        expected: usize,
        actual: usize,
    },
    Volume {
        link: Link,
        expected: u64,
        actual: u64,
    },
    Header {
        link: Link,
        index: usize,
        expected: Header,
        actual: Header,
    },
    BeatCount {
        link: Link,
        index: usize,
        expected: usize,
        actual: usize,
    },
    BeatAddress {
        link: Link,
        index: usize,
        beat: usize,
        expected: u64,
        actual: u64,
    },
    Data {
        link: Link,
        index: usize,
        header: Header,
        beat: usize,
        expected: u64,
        actual: u64,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count {
                trace,
                expected,
                actual,
            } => write!(
                f,
                "{:?}: expected {} transactions, got {}",
                trace, expected, actual
            ),
            Self::Volume {
                link,
                expected,
                actual,
            } => write!(
                f,
                "{:?}: expected {} bytes, got {}",
                link, expected, actual
            ),
            Self::Header {
                link,
                index,
                expected,
                actual,
            } => write!(
                f,
                "{:?} #{}: header mismatch\n  expected {}\n  actual   {}",
                link, index, expected, actual
            ),
            Self::BeatCount {
                link,
                index,
                expected,
                actual,
            } => write!(
                f,
                "{:?} #{}: expected {} beats, got {}",
                link, index, expected, actual
            ),
            Self::BeatAddress {
                link,
                index,
                beat,
                expected,
                actual,
            } => write!(
                f,
                "{:?} #{} beat {}: expected address {:#012x}, got {:#012x}",
                link, index, beat, expected, actual
            ),
            Self::Data {
                link,
                index,
                header,
                beat,
                expected,
                actual,
            } => write!(
                f,
                "{:?} #{} beat {}: data mismatch for {}\n  expected {:#018x}\n  actual   {:#018x}",
                link, index, beat, header, expected, actual
            ),
        }
    }
}

/// Verification verdict. Keeps the first `cap` mismatches but counts all of
/// them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Report {
    cap: usize,
    mismatches: Vec<Mismatch>,
    count: usize,
}

impl Report {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            mismatches: Vec::new(),
            count: 0,
        }
    }

    pub fn record(&mut self, mismatch: Mismatch) {
        if self.mismatches.len() < self.cap {
            error!("{}", mismatch);
            self.mismatches.push(mismatch);
        }
        self.count += 1;
    }

    pub fn passed(&self) -> bool {
        self.count == 0
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Total number of mismatches, including the ones not kept.
    pub fn mismatch_count(&self) -> usize {
        self.count
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "PASS");
        }
        write!(
            f,
            "FAIL: {} mismatches (showing {})",
            self.count,
            self.mismatches.len()
        )?;
        for mismatch in self.mismatches.iter() {
            write!(f, "\n{}", mismatch)?;
        }
        Ok(())
    }
}

/// Compares the traces of a run of `test_size` transactions.
///
/// A trace of the wrong length makes positional comparison meaningless, so
/// count mismatches are reported alone.
pub fn compare(traces: &Traces, test_size: usize, error_cap: usize) -> Report {
    let mut report = Report::new(error_cap);
    for (trace, transactions) in [
        (Trace::SentCommands, traces.sent_commands),
        (Trace::ReceivedCommands, traces.received_commands),
        (Trace::SentResponses, traces.sent_responses),
        (Trace::ReceivedResponses, traces.received_responses),
    ] {
        if transactions.len() != test_size {
            report.record(Mismatch::Count {
                trace,
                expected: test_size,
                actual: transactions.len(),
            });
        }
    }
    if !report.passed() {
        return report;
    }

    let write_bytes = volume(traces.sent_commands, true);
    let received_write_bytes = volume(traces.received_commands, true);
    if write_bytes != received_write_bytes {
        report.record(Mismatch::Volume {
            link: Link::Command,
            expected: write_bytes,
            actual: received_write_bytes,
        });
    }
    let read_bytes = volume(traces.sent_responses, false);
    let received_read_bytes = volume(traces.received_responses, false);
    if read_bytes != received_read_bytes {
        report.record(Mismatch::Volume {
            link: Link::Response,
            expected: read_bytes,
            actual: received_read_bytes,
        });
    }

    for (index, (sent, received)) in traces
        .sent_commands
        .iter()
        .zip_eq(traces.received_commands)
        .enumerate()
    {
        compare_transaction(&mut report, Link::Command, index, sent, received);
    }
    for (index, (sent, received)) in traces
        .sent_responses
        .iter()
        .zip_eq(traces.received_responses)
        .enumerate()
    {
        compare_transaction(&mut report, Link::Response, index, sent, received);
    }
    for (index, (command, response)) in traces
        .sent_commands
        .iter()
        .zip_eq(traces.received_responses)
        .enumerate()
    {
        if command.header != response.header {
            report.record(Mismatch::Header {
                link: Link::Echo,
                index,
                expected: command.header,
                actual: response.header,
            });
        }
    }
    report
}

/// Bytes implied by the size fields of the writes (or reads) in a trace.
fn volume(transactions: &[Transaction], writes: bool) -> u64 {
    transactions
        .iter()
        .filter(|tx| tx.header.msg_type.is_write() == writes)
        .map(|tx| tx.header.bytes())
        .sum()
}

fn compare_transaction(
    report: &mut Report,
    link: Link,
    index: usize,
    sent: &Transaction,
    received: &Transaction,
) {
    if sent.header != received.header {
        report.record(Mismatch::Header {
            link,
            index,
            expected: sent.header,
            actual: received.header,
        });
        return;
    }
    let beats = sent.beats();
    if received.data.len() != beats {
        report.record(Mismatch::BeatCount {
            link,
            index,
            expected: beats,
            actual: received.data.len(),
        });
        return;
    }
    for (beat, actual) in received.beat_addrs.iter().enumerate() {
        let expected = sent.header.beat_addr(beat);
        if *actual != expected {
            report.record(Mismatch::BeatAddress {
                link,
                index,
                beat,
                expected,
                actual: *actual,
            });
        }
    }
    // command data is meaningful for writes only, response data for reads only
    let carries_data = match link {
        Link::Command => sent.header.msg_type.is_write(),
        _ => sent.header.msg_type.is_read(),
    };
    if !carries_data {
        return;
    }
    for (beat, (expected, actual)) in sent
        .wire_order_data()
        .into_iter()
        .zip(received.data.iter().copied())
        .enumerate()
    {
        if expected != actual {
            report.record(Mismatch::Data {
                link,
                index,
                header: sent.header,
                beat,
                expected,
                actual,
            });
        }
    }
}
