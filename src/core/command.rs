use crate::core::buffer::CommandBuffer;
use crate::error::{constants, Result, SessionError};
use bytes::Bytes;
use std::fmt;

/// Two-byte command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(pub u16);

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// A decoded client command awaiting dispatch.
#[derive(Debug, Clone)]
pub struct Command {
    opcode: Opcode,
    pub payload: CommandBuffer,
    arrival: u64,
}

impl Command {
    pub fn new(opcode: Opcode, payload: CommandBuffer) -> Self {
        Self {
            opcode,
            payload,
            arrival: 0,
        }
    }

    /// Split a raw command into its opcode header and payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(SessionError::MalformedField(constants::ERR_EMPTY_COMMAND));
        }
        let opcode = Opcode(u16::from_le_bytes([bytes[0], bytes[1]]));
        Ok(Self::new(opcode, CommandBuffer::from_slice(&bytes[2..])))
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Position assigned by the queue on push.
    pub fn arrival(&self) -> u64 {
        self.arrival
    }

    pub(crate) fn set_arrival(&mut self, arrival: u64) {
        self.arrival = arrival;
    }
}

/// Server-to-client packet produced by handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPacket {
    pub opcode: Opcode,
    pub body: Bytes,
}

impl OutboundPacket {
    pub fn new(opcode: Opcode, body: CommandBuffer) -> Self {
        Self {
            opcode,
            body: body.freeze(),
        }
    }

    pub fn empty(opcode: Opcode) -> Self {
        Self {
            opcode,
            body: Bytes::new(),
        }
    }

    /// Reader over the body, for inspection in tests and tooling.
    pub fn reader(&self) -> CommandBuffer {
        CommandBuffer::from_slice(&self.body)
    }
}
