//! Tokio codec for the size-prefixed command frame.
//!
//! ```text
//! [Size(2, big-endian)] [Opcode(2, little-endian)] [Payload(Size - 2)]
//! ```

use crate::core::command::{Command, OutboundPacket};
use crate::error::{Result, SessionError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Largest frame a client may send, header excluded.
pub const MAX_COMMAND_SIZE: usize = 10240;

const SIZE_HEADER: usize = 2;
const OPCODE_HEADER: usize = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct CommandCodec;

impl Decoder for CommandCodec {
    type Item = Command;
    type Error = SessionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>> {
        if src.len() < SIZE_HEADER {
            return Ok(None);
        }

        let size = u16::from_be_bytes([src[0], src[1]]) as usize;
        if size < OPCODE_HEADER {
            return Err(SessionError::MalformedField("frame shorter than opcode"));
        }
        if size > MAX_COMMAND_SIZE {
            return Err(SessionError::OversizedCommand(size));
        }

        if src.len() < SIZE_HEADER + size {
            src.reserve(SIZE_HEADER + size - src.len());
            return Ok(None);
        }

        src.advance(SIZE_HEADER);
        let frame = src.split_to(size);
        Command::decode(&frame).map(Some)
    }
}

impl Encoder<OutboundPacket> for CommandCodec {
    type Error = SessionError;

    fn encode(&mut self, packet: OutboundPacket, dst: &mut BytesMut) -> Result<()> {
        write_frame(packet.opcode.0, &packet.body, dst)
    }
}

impl Encoder<Command> for CommandCodec {
    type Error = SessionError;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<()> {
        write_frame(command.opcode().0, command.payload.as_slice(), dst)
    }
}

fn write_frame(opcode: u16, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    let size = OPCODE_HEADER + body.len();
    let wire_size = u16::try_from(size).map_err(|_| SessionError::OversizedCommand(size))?;
    dst.reserve(SIZE_HEADER + size);
    dst.put_u16(wire_size);
    dst.put_u16_le(opcode);
    dst.put_slice(body);
    Ok(())
}
