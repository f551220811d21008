//! Relay identities and the in-memory relay state model.

/// The four channels on the relay board, in wire-id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayId {
    Heater,
    Solenoid,
    Pump,
    Load,
}

impl RelayId {
    pub const ALL: [RelayId; 4] = [
        RelayId::Heater,
        RelayId::Solenoid,
        RelayId::Pump,
        RelayId::Load,
    ];

    /// Channel number used on the wire protocol (1-based).
    pub fn wire_id(self) -> u8 {
        match self {
            RelayId::Heater => 1,
            RelayId::Solenoid => 2,
            RelayId::Pump => 3,
            RelayId::Load => 4,
        }
    }

    pub fn from_wire_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.wire_id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            RelayId::Heater => "heater",
            RelayId::Solenoid => "solenoid",
            RelayId::Pump => "pump",
            RelayId::Load => "load",
        }
    }

    fn index(self) -> usize {
        (self.wire_id() - 1) as usize
    }
}

/// Last-commanded state of all four relays.
///
/// This mirrors what the controller has asked for; there is no readback
/// from the board, so it is the single source of truth for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayBank([bool; 4]);

impl RelayBank {
    pub fn get(&self, relay: RelayId) -> bool {
        self.0[relay.index()]
    }

    pub fn set(&mut self, relay: RelayId, on: bool) {
        self.0[relay.index()] = on;
    }

    /// States in wire-id order: heater, solenoid, pump, load.
    pub fn as_array(&self) -> [bool; 4] {
        self.0
    }
}
