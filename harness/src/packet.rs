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

//! BedRock packets: the packed header word, single wire beats and whole
//! (possibly multi-beat) transactions.

use bitvec::field::BitField;
use bitvec::order::Lsb0;
use bitvec::view::BitView;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt;
use std::ops::Range;

use crate::Error;

/// Width of the address field in bits.
pub const ADDR_WIDTH: usize = 40;
pub const ADDR_MASK: u64 = (1 << ADDR_WIDTH) - 1;

/// Width of the data channel in bits.
pub const BEAT_WIDTH: usize = 64;
pub const BEAT_BYTES: u64 = (BEAT_WIDTH / 8) as u64;

/// Largest legal `size`: 64 bytes, i.e. 8 beats.
pub const MAX_SIZE: u8 = 6;

// Header layout, least significant bit first.
const MSG_TYPE: Range<usize> = 0..4;
const SUBOP: Range<usize> = 4..8;
const ADDR: Range<usize> = 8..48;
const SIZE: Range<usize> = 48..51;
const PAYLOAD: Range<usize> = 51..64;

pub const SUBOP_MASK: u8 = 0xF;
pub const PAYLOAD_MASK: u16 = 0x1FFF;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromPrimitive)]
pub enum MsgType {
    Read = 0,
    Write = 1,
    UncachedRead = 2,
    UncachedWrite = 3,
}

impl MsgType {
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::UncachedRead)
    }

    pub fn is_write(self) -> bool {
        !self.is_read()
    }

    pub fn is_cached(self) -> bool {
        matches!(self, Self::Read | Self::Write)
    }
}

/// The header of a BedRock message.
///
/// On the wire this is a single 64 bit word, see `pack` and `unpack`. Every
/// beat of a multi-beat transaction carries its own header, which differs
/// from the first one only in `addr`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Header {
    pub msg_type: MsgType,
    /// Secondary opcode; opaque at this level.
    pub subop: u8,
    pub addr: u64,
    /// log2 of the transfer length in bytes.
    pub size: u8,
    /// Auxiliary metadata; opaque at this level.
    pub payload: u16,
}

impl Header {
    pub fn new(msg_type: MsgType, addr: u64, size: u8) -> Self {
        Self {
            msg_type,
            subop: 0,
            addr,
            size,
            payload: 0,
        }
    }

    pub fn pack(&self) -> u64 {
        let mut word = 0u64;
        let bits = word.view_bits_mut::<Lsb0>();
        bits[MSG_TYPE].store_le(self.msg_type as u8);
        bits[SUBOP].store_le(self.subop & SUBOP_MASK);
        bits[ADDR].store_le(self.addr & ADDR_MASK);
        bits[SIZE].store_le(self.size & 0x7);
        bits[PAYLOAD].store_le(self.payload & PAYLOAD_MASK);
        word
    }

    pub fn unpack(word: u64) -> Result<Self, Error> {
        let bits = word.view_bits::<Lsb0>();
        let raw_type: u8 = bits[MSG_TYPE].load_le();
        let msg_type = MsgType::from_u8(raw_type).ok_or(Error::InvalidMsgType(raw_type))?;
        Ok(Self {
            msg_type,
            subop: bits[SUBOP].load_le(),
            addr: bits[ADDR].load_le(),
            size: bits[SIZE].load_le(),
            payload: bits[PAYLOAD].load_le(),
        })
    }

    /// Number of bytes the transaction covers.
    pub fn bytes(&self) -> u64 {
        1 << self.size
    }

    /// Number of data beats needed to carry `bytes()`.
    pub fn beat_count(&self) -> usize {
        std::cmp::max(1, self.bytes() / BEAT_BYTES) as usize
    }

    /// Start of the aligned block the transaction wraps within.
    pub fn block_base(&self) -> u64 {
        self.addr & !(self.bytes() - 1)
    }

    /// Address of beat `i`, wrapping within the aligned block starting from
    /// the critical word.
    pub fn beat_addr(&self, i: usize) -> u64 {
        let block = self.bytes();
        if block <= BEAT_BYTES {
            return self.addr;
        }
        let offset = self.addr & (block - 1);
        self.block_base() + ((offset + i as u64 * BEAT_BYTES) % block)
    }

    /// Index of the address-ordered data word covering `addr`.
    pub fn word_index(&self, addr: u64) -> usize {
        if self.beat_count() == 1 {
            0
        } else {
            ((addr - self.block_base()) / BEAT_BYTES) as usize
        }
    }

    /// The header with `addr` replaced by the block base; identical for all
    /// beats of one transaction.
    pub fn stream_key(&self) -> Self {
        Self {
            addr: self.block_base(),
            ..*self
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.size > MAX_SIZE {
            return Err(Error::InvalidSize(self.size));
        }
        if self.addr > ADDR_MASK {
            return Err(Error::AddressOutOfRange(self.addr));
        }
        let align = std::cmp::min(self.bytes(), BEAT_BYTES);
        if self.addr & (align - 1) != 0 {
            return Err(Error::MisalignedAddress {
                addr: self.addr,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} addr={:#012x} size={} subop={:#x} payload={:#06x} ({:#018x})",
            self.msg_type,
            self.addr,
            self.size,
            self.subop,
            self.payload,
            self.pack()
        )
    }
}

/// One transfer on a channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Beat {
    pub header: Header,
    /// Set on the final beat of a transaction.
    pub last: bool,
    pub data: u64,
}

/// A logical read or write.
///
/// Transactions created by the generator or synthesized by the client keep
/// `data` in block address order. Transactions reassembled from the wire
/// keep `data` in arrival order and record the observed address of every
/// beat in `beat_addrs`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    pub header: Header,
    pub data: Vec<u64>,
    pub beat_addrs: Vec<u64>,
}

impl Transaction {
    pub fn new(header: Header, data: Vec<u64>) -> Self {
        Self {
            header,
            data,
            beat_addrs: Vec::new(),
        }
    }

    /// Number of wire beats. Transactions without data (read commands)
    /// still occupy one beat per transfer of the requested size.
    pub fn beats(&self) -> usize {
        if self.data.is_empty() {
            self.header.beat_count()
        } else {
            self.data.len()
        }
    }

    /// `data` permuted into the order the beats go out on the wire.
    pub fn wire_order_data(&self) -> Vec<u64> {
        if self.data.len() != self.header.beat_count() {
            return self.data.clone();
        }
        (0..self.data.len())
            .map(|i| self.data[self.header.word_index(self.header.beat_addr(i))])
            .collect()
    }

    /// `(address, data)` for every beat, in wire order.
    pub fn beat_words(&self) -> Vec<(u64, u64)> {
        if self.beat_addrs.len() == self.data.len() && !self.beat_addrs.is_empty() {
            return self
                .beat_addrs
                .iter()
                .copied()
                .zip(self.data.iter().copied())
                .collect();
        }
        self.wire_order_data()
            .into_iter()
            .enumerate()
            .map(|(i, word)| (self.header.beat_addr(i), word))
            .collect()
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.header.validate()?;
        if self.header.msg_type.is_write() && self.data.len() != self.header.beat_count() {
            return Err(Error::DataLength {
                expected: self.header.beat_count(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        for word in self.data.iter() {
            write!(f, "\n  {:#018x}", word)?;
        }
        Ok(())
    }
}

/// Transfers narrower than the data channel must be replicated across all
/// byte lanes; keeps the low `(1 << size) * 8` bits of `data` and repeats
/// them across the word.
pub fn replicate(data: u64, size: u8) -> u64 {
    if size >= 3 {
        return data;
    }
    let width = 8u32 << size;
    let lane = data & ((1u64 << width) - 1);
    (0..BEAT_WIDTH as u32 / width).fold(0, |word, i| word | (lane << (i * width)))
}
