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

//! The client endpoint: accepts commands and answers each one.

use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::config::{ClientConfig, ResponseData, WriteAck};
use crate::signals::{ClientDrive, Clocked, Port};
use crate::{replicate, Beat, Cooldown, Error, Joiner, Memory, Splitter, Transaction};

pub struct Client {
    test_size: usize,
    write_ack: WriteAck,

    joiner: Joiner,
    commands: Vec<Transaction>,

    responses: Vec<Transaction>,
    splitter: Splitter,

    /// Gates the command ready signal.
    ready_cooldown: Cooldown,
    /// Gates the response valid signal.
    valid_cooldown: Cooldown,
    rng: Xoshiro256StarStar,

    /// Backing store when responding as a RAM.
    memory: Option<Memory>,
}

impl Client {
    pub fn new(config: &ClientConfig, test_size: usize, seed: u64) -> Self {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        rng.long_jump();
        Self {
            test_size,
            write_ack: config.write_ack,
            joiner: Joiner::new(),
            commands: Vec::new(),
            responses: Vec::new(),
            splitter: Splitter::new(),
            ready_cooldown: Cooldown::new(config.cooldown_limit),
            valid_cooldown: Cooldown::new(config.cooldown_limit),
            rng,
            memory: match config.response_data {
                ResponseData::Random => None,
                ResponseData::Memory => Some(Memory::new()),
            },
        }
    }

    /// Handshake on the command channel. A completed command is answered
    /// right away; the response queues behind earlier ones.
    pub fn advance_receive(&mut self, beat: Beat) -> Result<(), Error> {
        trace!("client received beat {:?}", beat);
        if let Some(command) = self.joiner.push(beat) {
            if self.commands.len() >= self.test_size {
                return Err(Error::TooManyCommands {
                    test_size: self.test_size,
                });
            }
            debug!("client received command: {}", command.header);
            let response = self.respond(&command);
            self.commands.push(command);
            self.responses.push(response);
            self.ready_cooldown.resample(&mut self.rng);
        }
        Ok(())
    }

    /// Handshake on the response channel.
    pub fn advance_send(&mut self) -> Result<(), Error> {
        match self.splitter.advance(&self.responses) {
            None => Err(Error::HandshakeWithoutPending("client response")),
            Some(true) => {
                self.valid_cooldown.resample(&mut self.rng);
                Ok(())
            }
            Some(false) => Ok(()),
        }
    }

    /// Builds the response: the command header unchanged, read data from
    /// the RNG or the memory, and a single-word acknowledgement for writes.
    fn respond(&mut self, command: &Transaction) -> Transaction {
        let header = command.header;
        let data = if header.msg_type.is_read() {
            match &self.memory {
                Some(memory) => memory.read(&header),
                None => {
                    let rng = &mut self.rng;
                    (0..header.beat_count())
                        .map(|_| replicate(rng.gen(), header.size))
                        .collect()
                }
            }
        } else {
            if let Some(memory) = self.memory.as_mut() {
                memory.write(command);
            }
            match self.write_ack {
                WriteAck::Random => vec![replicate(self.rng.gen(), header.size)],
                WriteAck::Echo => vec![command.data.first().copied().unwrap_or(0)],
            }
        };
        Transaction::new(header, data)
    }

    pub fn is_done(&self) -> bool {
        self.commands.len() == self.test_size && self.splitter.is_idle(&self.responses)
    }

    /// Number of responses sent.
    pub fn progress(&self) -> usize {
        self.splitter.sent()
    }

    pub fn memory(&self) -> Option<&Memory> {
        self.memory.as_ref()
    }

    /// The responses, in the order they were issued.
    pub fn sent_trace(&self) -> &[Transaction] {
        &self.responses
    }

    /// The commands as reassembled from the wire.
    pub fn received_trace(&self) -> &[Transaction] {
        &self.commands
    }
}

impl Clocked for Client {
    type Drive = ClientDrive;
    type Observe = Port;

    fn drive(&mut self) -> ClientDrive {
        let cmd_ready = self.ready_cooldown.expired();
        let resp = if self.valid_cooldown.expired() {
            self.splitter.current(&self.responses)
        } else {
            None
        };
        self.ready_cooldown.tick();
        self.valid_cooldown.tick();
        ClientDrive { cmd_ready, resp }
    }

    fn observe(&mut self, port: &Port) -> Result<(), Error> {
        if let Some(beat) = port.cmd.fire() {
            self.advance_receive(beat)?;
        }
        if port.resp.fire().is_some() {
            self.advance_send()?;
        }
        Ok(())
    }
}
