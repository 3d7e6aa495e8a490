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

//! Handshake signals exchanged once per round.
//!
//! Nothing here is shared by reference: every party returns what it drives
//! as an owned record, the scheduler merges the records into one `Signals`
//! snapshot, and every party then observes that snapshot. Each signal has
//! exactly one writer.

use crate::{Beat, Error};

/// A party that takes part in the two-phase round.
pub trait Clocked {
    /// What the party drives in the stimulus phase.
    type Drive;

    /// What the party reads in the observation phase.
    type Observe;

    /// Stimulus phase: compute outputs from the current state only.
    fn drive(&mut self) -> Self::Drive;

    /// Observation phase: update state from the settled signals. Fatal
    /// protocol violations are returned as errors.
    fn observe(&mut self, signals: &Self::Observe) -> Result<(), Error>;
}

/// One valid/ready channel; `beat` being present is the valid signal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Channel {
    pub beat: Option<Beat>,
    pub ready: bool,
}

impl Channel {
    pub fn valid(&self) -> bool {
        self.beat.is_some()
    }

    /// The beat transferred this round, if the handshake completed.
    pub fn fire(&self) -> Option<Beat> {
        if self.ready {
            self.beat
        } else {
            None
        }
    }
}

/// Command and response channel of one endpoint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Port {
    pub cmd: Channel,
    pub resp: Channel,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MasterDrive {
    pub cmd: Option<Beat>,
    pub resp_ready: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ClientDrive {
    pub cmd_ready: bool,
    pub resp: Option<Beat>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BridgeDrive {
    pub master_cmd_ready: bool,
    pub master_resp: Option<Beat>,
    pub client_cmd: Option<Beat>,
    pub client_resp_ready: bool,
}

/// All signals of one round.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Signals {
    pub master: Port,
    pub client: Port,
}

impl Signals {
    pub fn merge(master: MasterDrive, client: ClientDrive, bridge: BridgeDrive) -> Self {
        Self {
            master: Port {
                cmd: Channel {
                    beat: master.cmd,
                    ready: bridge.master_cmd_ready,
                },
                resp: Channel {
                    beat: bridge.master_resp,
                    ready: master.resp_ready,
                },
            },
            client: Port {
                cmd: Channel {
                    beat: bridge.client_cmd,
                    ready: client.cmd_ready,
                },
                resp: Channel {
                    beat: client.resp,
                    ready: bridge.client_resp_ready,
                },
            },
        }
    }
}
