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

//! Splitting transactions into wire beats and joining them back.

use log::trace;
use std::collections::HashMap;

use crate::{Beat, Header, Transaction};

/// Beat `i` of `tx` as it goes out on the wire.
///
/// The address wraps within the aligned block starting at the critical
/// word; the data word is the one covering that address.
pub fn beat_of(tx: &Transaction, i: usize) -> Beat {
    let n = tx.beats();
    let addr = tx.header.beat_addr(i);
    let data = if tx.data.is_empty() {
        0
    } else if tx.data.len() == tx.header.beat_count() {
        tx.data[tx.header.word_index(addr)]
    } else {
        tx.data[i]
    };
    Beat {
        header: Header { addr, ..tx.header },
        last: i + 1 == n,
        data,
    }
}

/// All beats of `tx`, in wire order.
pub fn split(tx: &Transaction) -> impl Iterator<Item = Beat> + '_ {
    (0..tx.beats()).map(move |i| beat_of(tx, i))
}

/// Cursor over the beats of a queue of transactions.
#[derive(Debug, Default)]
pub struct Splitter {
    /// index of the transaction being sent
    index: usize,
    /// index of the beat within that transaction
    beat: usize,
}

impl Splitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The beat to offer on the wire, if any transaction is left.
    pub fn current(&self, queue: &[Transaction]) -> Option<Beat> {
        queue.get(self.index).map(|tx| beat_of(tx, self.beat))
    }

    /// Moves past the current beat after a handshake. Returns `None` if
    /// nothing was pending, otherwise whether the beat completed its
    /// transaction.
    pub fn advance(&mut self, queue: &[Transaction]) -> Option<bool> {
        let tx = queue.get(self.index)?;
        self.beat += 1;
        if self.beat == tx.beats() {
            self.index += 1;
            self.beat = 0;
            Some(true)
        } else {
            Some(false)
        }
    }

    /// Number of transactions fully sent.
    pub fn sent(&self) -> usize {
        self.index
    }

    pub fn is_idle(&self, queue: &[Transaction]) -> bool {
        self.index >= queue.len()
    }
}

/// Reassembles beats into transactions.
///
/// Beats of one transaction are collected under their stream key (the
/// header with the address folded to the block base), so the wrap order of
/// the addresses does not matter.
#[derive(Debug, Default)]
pub struct Joiner {
    partial: HashMap<Header, Transaction>,
}

impl Joiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one received beat; returns the transaction it completes.
    pub fn push(&mut self, beat: Beat) -> Option<Transaction> {
        let key = beat.header.stream_key();
        let tx = self.partial.entry(key).or_insert_with(|| Transaction {
            header: beat.header,
            data: Vec::new(),
            beat_addrs: Vec::new(),
        });
        tx.data.push(beat.data);
        tx.beat_addrs.push(beat.header.addr);
        trace!(
            "joined beat {} of {:#x}, last: {}",
            tx.data.len(),
            key.addr,
            beat.last
        );
        if beat.last {
            self.partial.remove(&key)
        } else {
            None
        }
    }

    /// Number of transactions with some but not all beats received.
    pub fn in_flight(&self) -> usize {
        self.partial.len()
    }
}
