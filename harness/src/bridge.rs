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

//! Reference bridges, so the endpoints can be exercised without a
//! hardware model.

use bitvec::order::Lsb0;
use bitvec::view::BitView;
use log::{info, trace};
use rand::Rng;
use rand_core::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::config::BridgeConfig;
use crate::signals::{BridgeDrive, Clocked, Signals};
use crate::{Beat, Cycle, Error, BEAT_WIDTH};

/// A unidirectional beat carrier.
pub trait Transport {
    /// Whether `try_send` would accept a beat this round.
    fn can_send(&self) -> bool;

    /// Enqueues a beat; returns false if there is no room.
    fn try_send(&mut self, beat: Beat) -> bool;

    /// The beat available to the receiver this round.
    fn peek(&self) -> Option<Beat>;

    fn try_receive(&mut self) -> Option<Beat>;

    /// End of round.
    fn tick(&mut self);

    /// Beats currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed capacity FIFO in which every beat spends `latency` rounds before
/// the receiver can see it.
pub struct LinkBuffer {
    /// Circular buffer of beats, tagged with the round they become visible.
    buffer: Vec<Option<(Beat, Cycle)>>,

    /// The write pointer into the circular buffer.
    write_idx: usize,

    /// The read pointer into the circular buffer.
    read_idx: usize,

    /// The number of beats in the buffer.
    occupancy: usize,

    latency: Cycle,
    now: Cycle,
}

impl LinkBuffer {
    pub fn new(capacity: usize, latency: Cycle) -> Self {
        assert!(capacity > 0, "link capacity must be positive");
        Self {
            buffer: vec![None; capacity],
            write_idx: 0,
            read_idx: 0,
            occupancy: 0,
            latency,
            now: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

impl Transport for LinkBuffer {
    fn can_send(&self) -> bool {
        self.occupancy < self.buffer.len()
    }

    fn try_send(&mut self, beat: Beat) -> bool {
        if !self.can_send() {
            return false;
        }
        // sent during round `now`, visible from round `now + 1 + latency`
        self.buffer[self.write_idx] = Some((beat, self.now + 1 + self.latency));
        self.write_idx = (self.write_idx + 1) % self.buffer.len();
        self.occupancy += 1;
        trace!(
            "link write_idx: {}, occupancy: {}",
            self.write_idx,
            self.occupancy
        );
        true
    }

    fn peek(&self) -> Option<Beat> {
        if self.occupancy == 0 {
            return None;
        }
        match self.buffer[self.read_idx] {
            Some((beat, visible)) if visible <= self.now => Some(beat),
            _ => None,
        }
    }

    fn try_receive(&mut self) -> Option<Beat> {
        let beat = self.peek()?;
        self.buffer[self.read_idx] = None;
        self.read_idx = (self.read_idx + 1) % self.buffer.len();
        self.occupancy -= 1;
        Some(beat)
    }

    fn tick(&mut self) {
        self.now += 1;
    }

    fn len(&self) -> usize {
        self.occupancy
    }
}

/// Faults the loopback bridge injects.
pub struct FailureProperties {
    /// Probability a beat has one data bit flipped in transit.
    pub corruption_rate: f64,

    /// Probability a delivered response beat is delivered again.
    pub duplication_rate: f64,

    /// Round from which the bridge stops moving beats.
    pub induced_stall: Option<Cycle>,

    /// Random number generator used to calculate probabilities.
    /// Note: the RNG provided by the Default implementation is deterministic.
    pub rng: Box<dyn RngCore>,
}

impl Default for FailureProperties {
    /// No failures. The RNG is deterministic.
    fn default() -> Self {
        Self {
            corruption_rate: 0.0,
            duplication_rate: 0.0,
            induced_stall: None,
            rng: Box::new(Xoshiro256StarStar::seed_from_u64(0x87654321FEDCBA09u64)),
        }
    }
}

impl FailureProperties {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            corruption_rate: config.corruption_rate,
            duplication_rate: config.duplication_rate,
            induced_stall: config.induced_stall,
            ..Default::default()
        }
    }
}

/// Connects the master command port to the client command port and the
/// client response port to the master response port, each through its own
/// transport.
pub struct LoopbackBridge<T: Transport = LinkBuffer> {
    cmd: T,
    resp: T,
    failures: FailureProperties,
    round: Cycle,
}

impl LoopbackBridge {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_links(
            LinkBuffer::new(config.capacity, config.latency),
            LinkBuffer::new(config.capacity, config.latency),
            FailureProperties::from_config(config),
        )
    }
}

impl<T: Transport> LoopbackBridge<T> {
    pub fn with_links(cmd: T, resp: T, failures: FailureProperties) -> Self {
        Self {
            cmd,
            resp,
            failures,
            round: 0,
        }
    }

    /// Beats inside the bridge.
    pub fn in_flight(&self) -> usize {
        self.cmd.len() + self.resp.len()
    }

    fn stalled(&self) -> bool {
        matches!(self.failures.induced_stall, Some(round) if self.round >= round)
    }

    fn corrupt(&mut self, mut beat: Beat, channel: &str) -> Beat {
        if self.failures.corruption_rate > 0.0
            && self.failures.rng.gen_bool(self.failures.corruption_rate)
        {
            info!(
                "Randomly injecting beat corruption on the {} channel @round {}",
                channel, self.round
            );
            let idx = self.failures.rng.gen_range(0..BEAT_WIDTH);
            let bits = beat.data.view_bits_mut::<Lsb0>();
            let bit = bits[idx];
            bits.set(idx, !bit);
        }
        beat
    }

    fn duplicate(&mut self) -> bool {
        if self.failures.duplication_rate > 0.0
            && self.failures.rng.gen_bool(self.failures.duplication_rate)
        {
            info!("Randomly duplicating a response beat @round {}", self.round);
            return true;
        }
        false
    }
}

impl<T: Transport> Clocked for LoopbackBridge<T> {
    type Drive = BridgeDrive;
    type Observe = Signals;

    fn drive(&mut self) -> BridgeDrive {
        if self.stalled() {
            return BridgeDrive::default();
        }
        BridgeDrive {
            master_cmd_ready: self.cmd.can_send(),
            master_resp: self.resp.peek(),
            client_cmd: self.cmd.peek(),
            client_resp_ready: self.resp.can_send(),
        }
    }

    fn observe(&mut self, signals: &Signals) -> Result<(), Error> {
        if let Some(beat) = signals.master.cmd.fire() {
            let beat = self.corrupt(beat, "command");
            if !self.cmd.try_send(beat) {
                return Err(Error::LinkOverflow("command"));
            }
        }
        if signals.client.cmd.fire().is_some() {
            self.cmd.try_receive();
        }
        if let Some(beat) = signals.client.resp.fire() {
            let beat = self.corrupt(beat, "response");
            if !self.resp.try_send(beat) {
                return Err(Error::LinkOverflow("response"));
            }
        }
        if signals.master.resp.fire().is_some() && !self.duplicate() {
            self.resp.try_receive();
        }
        self.cmd.tick();
        self.resp.tick();
        self.round += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{Channel, Port};
    use crate::{Header, MsgType};

    fn beat(data: u64) -> Beat {
        Beat {
            header: Header::new(MsgType::UncachedWrite, 0x10, 3),
            last: true,
            data,
        }
    }

    #[test]
    fn latency_and_capacity() {
        let mut link = LinkBuffer::new(2, 2);
        assert!(link.try_send(beat(1)));
        assert!(link.try_send(beat(2)));
        assert!(!link.can_send());
        assert!(!link.try_send(beat(3)));
        for _ in 0..2 {
            assert_eq!(link.peek(), None);
            link.tick();
        }
        assert_eq!(link.peek(), None);
        link.tick();
        assert_eq!(link.try_receive(), Some(beat(1)));
        assert_eq!(link.try_receive(), Some(beat(2)));
        assert_eq!(link.try_receive(), None);
        assert!(link.is_empty());
    }

    #[test]
    fn ring_wraps_around() {
        let mut link = LinkBuffer::new(3, 0);
        for i in 0..10 {
            assert!(link.try_send(beat(i)));
            link.tick();
            assert_eq!(link.try_receive(), Some(beat(i)));
        }
        assert_eq!(link.capacity(), 3);
    }

    #[test]
    fn loopback_moves_commands() {
        let mut bridge = LoopbackBridge::new(&BridgeConfig {
            latency: 0,
            ..Default::default()
        });
        let drive = bridge.drive();
        assert!(drive.master_cmd_ready);
        assert_eq!(drive.client_cmd, None);
        let signals = Signals {
            master: Port {
                cmd: Channel {
                    beat: Some(beat(7)),
                    ready: drive.master_cmd_ready,
                },
                ..Default::default()
            },
            ..Default::default()
        };
        bridge.observe(&signals).unwrap();
        assert_eq!(bridge.in_flight(), 1);
        assert_eq!(bridge.drive().client_cmd, Some(beat(7)));
    }

    #[test]
    fn corruption_flips_one_bit() {
        let mut bridge = LoopbackBridge::new(&BridgeConfig {
            corruption_rate: 1.0,
            ..Default::default()
        });
        let corrupted = bridge.corrupt(beat(0), "command");
        assert_eq!(corrupted.data.count_ones(), 1);
        assert_eq!(corrupted.header, beat(0).header);
    }

    #[test]
    fn stalled_bridge_drives_nothing() {
        let mut bridge = LoopbackBridge::new(&BridgeConfig {
            induced_stall: Some(0),
            ..Default::default()
        });
        assert_eq!(bridge.drive(), BridgeDrive::default());
    }
}
