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

//! The master endpoint: issues the generated command trace and collects the
//! responses.

use log::{debug, trace};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::config::MasterConfig;
use crate::signals::{Clocked, MasterDrive, Port};
use crate::{Beat, Cooldown, Error, Generator, Joiner, Splitter, Transaction};

pub struct Master {
    test_size: usize,

    /// The reference trace, fixed at construction.
    commands: Vec<Transaction>,
    splitter: Splitter,

    joiner: Joiner,
    responses: Vec<Transaction>,

    /// Gates the command valid signal.
    valid_cooldown: Cooldown,
    /// Gates the response ready signal.
    ready_cooldown: Cooldown,
    rng: Xoshiro256StarStar,
}

impl Master {
    /// Generates `test_size` commands from `seed`.
    ///
    /// The generator and the cooldowns draw from separate streams of the
    /// same seed; the client uses a third one.
    pub fn new(config: &MasterConfig, test_size: usize, seed: u64) -> Result<Self, Error> {
        let base = Xoshiro256StarStar::seed_from_u64(seed);
        let mut rng = base.clone();
        rng.jump();
        let commands = Generator::from_rng(&config.generator, base)?
            .take(test_size)
            .collect();
        Ok(Self::build(commands, rng, config.cooldown_limit))
    }

    /// A master that issues a scripted trace instead of a generated one.
    pub fn with_commands(
        commands: Vec<Transaction>,
        seed: u64,
        cooldown_limit: usize,
    ) -> Result<Self, Error> {
        for tx in commands.iter() {
            tx.validate()?;
        }
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        rng.jump();
        Ok(Self::build(commands, rng, cooldown_limit))
    }

    fn build(commands: Vec<Transaction>, rng: Xoshiro256StarStar, cooldown_limit: usize) -> Self {
        Self {
            test_size: commands.len(),
            commands,
            splitter: Splitter::new(),
            joiner: Joiner::new(),
            responses: Vec::new(),
            valid_cooldown: Cooldown::new(cooldown_limit),
            ready_cooldown: Cooldown::new(cooldown_limit),
            rng,
        }
    }

    /// Handshake on the command channel: move to the next beat, and after
    /// the last beat of a command to the next command.
    pub fn advance_send(&mut self) -> Result<(), Error> {
        match self.splitter.advance(&self.commands) {
            None => Err(Error::HandshakeWithoutPending("master command")),
            Some(true) => {
                debug!(
                    "master sent command {}/{}",
                    self.splitter.sent(),
                    self.test_size
                );
                self.valid_cooldown.resample(&mut self.rng);
                Ok(())
            }
            Some(false) => Ok(()),
        }
    }

    /// Handshake on the response channel.
    pub fn advance_receive(&mut self, beat: Beat) -> Result<(), Error> {
        trace!("master received beat {:?}", beat);
        if let Some(response) = self.joiner.push(beat) {
            if self.responses.len() >= self.test_size {
                return Err(Error::TooManyResponses {
                    test_size: self.test_size,
                });
            }
            debug!("master received response: {}", response.header);
            self.responses.push(response);
            self.ready_cooldown.resample(&mut self.rng);
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.responses.len() == self.test_size && self.splitter.is_idle(&self.commands)
    }

    /// Number of responses received.
    pub fn progress(&self) -> usize {
        self.responses.len()
    }

    pub fn test_size(&self) -> usize {
        self.test_size
    }

    pub fn sent_trace(&self) -> &[Transaction] {
        &self.commands
    }

    pub fn received_trace(&self) -> &[Transaction] {
        &self.responses
    }
}

impl Clocked for Master {
    type Drive = MasterDrive;
    type Observe = Port;

    fn drive(&mut self) -> MasterDrive {
        let cmd = if self.valid_cooldown.expired() {
            self.splitter.current(&self.commands)
        } else {
            None
        };
        let resp_ready = self.ready_cooldown.expired();
        self.valid_cooldown.tick();
        self.ready_cooldown.tick();
        MasterDrive { cmd, resp_ready }
    }

    fn observe(&mut self, port: &Port) -> Result<(), Error> {
        if port.cmd.fire().is_some() {
            self.advance_send()?;
        }
        if let Some(beat) = port.resp.fire() {
            self.advance_receive(beat)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Channel;
    use crate::{split, Header, MsgType};

    fn read(addr: u64, size: u8) -> Transaction {
        Transaction::new(Header::new(MsgType::UncachedRead, addr, size), vec![])
    }

    #[test]
    fn generated_trace_is_deterministic() {
        let config = MasterConfig::default();
        let a = Master::new(&config, 64, 1234).unwrap();
        let b = Master::new(&config, 64, 1234).unwrap();
        assert_eq!(a.sent_trace().len(), 64);
        assert_eq!(a.sent_trace(), b.sent_trace());
        assert!(!a.is_done());
    }

    #[test]
    fn valid_holds_until_accepted() {
        let mut master = Master::with_commands(vec![read(0x40, 4)], 0, 0).unwrap();
        let first = master.drive().cmd.unwrap();
        assert_eq!(first.header.addr, 0x40);
        master.observe(&Port::default()).unwrap();
        // not accepted: same beat again
        assert_eq!(master.drive().cmd, Some(first));
        let accepted = Port {
            cmd: Channel {
                beat: Some(first),
                ready: true,
            },
            ..Default::default()
        };
        master.observe(&accepted).unwrap();
        let second = master.drive().cmd.unwrap();
        assert_eq!(second.header.addr, 0x48);
        assert!(second.last);
        master.observe(&Port {
            cmd: Channel {
                beat: Some(second),
                ready: true,
            },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(master.drive().cmd, None);
        assert_eq!(
            master.advance_send(),
            Err(Error::HandshakeWithoutPending("master command"))
        );
    }

    #[test]
    fn too_many_responses_is_fatal() {
        let cmd = read(0x8, 3);
        let mut master = Master::with_commands(vec![cmd.clone()], 0, 0).unwrap();
        master.advance_send().unwrap();
        let response = Transaction::new(cmd.header, vec![0x55]);
        for beat in split(&response) {
            master.advance_receive(beat).unwrap();
        }
        assert!(master.is_done());
        assert_eq!(master.progress(), 1);
        let beat = split(&response).next().unwrap();
        assert_eq!(
            master.advance_receive(beat),
            Err(Error::TooManyResponses { test_size: 1 })
        );
    }

    #[test]
    fn scripted_commands_are_validated() {
        let bad = Transaction::new(Header::new(MsgType::UncachedWrite, 0x3, 1), vec![0]);
        assert!(Master::with_commands(vec![bad], 0, 8).is_err());
    }
}
