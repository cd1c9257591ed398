//! Structured read/write cursor over a command payload.
//!
//! Reads advance a cursor over the stored bytes; writes append at the end.
//! All integers are little-endian. Reading past the end never panics, it
//! yields [`SessionError::Malformed`] so the dispatcher can classify the
//! command as a protocol violation.

use crate::core::guid::ObjectGuid;
use crate::error::{Result, SessionError};
use bytes::{BufMut, Bytes, BytesMut};

/// Upper bound on a C string read from a payload.
const MAX_CSTRING_LEN: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    data: BytesMut,
    rpos: usize,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            rpos: 0,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            data: BytesMut::from(bytes),
            rpos: 0,
        }
    }

    /// Total stored length, read or not.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rpos(&self) -> usize {
        self.rpos
    }

    /// Bytes not yet consumed by a read.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.rpos)
    }

    /// Mark the rest of the payload as consumed.
    pub fn finish(&mut self) {
        self.rpos = self.data.len();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(SessionError::Malformed {
                needed: n,
                remaining,
            });
        }
        let start = self.rpos;
        self.rpos += n;
        Ok(&self.data[start..start + n])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_guid(&mut self) -> Result<ObjectGuid> {
        self.read_u64().map(ObjectGuid::from_raw)
    }

    /// Packed guid: a presence mask byte followed by each non-zero byte.
    pub fn read_packed_guid(&mut self) -> Result<ObjectGuid> {
        let mask = self.read_u8()?;
        let mut raw = 0u64;
        for i in 0..8 {
            if mask & (1 << i) != 0 {
                raw |= (self.read_u8()? as u64) << (i * 8);
            }
        }
        Ok(ObjectGuid::from_raw(raw))
    }

    /// NUL-terminated string. Invalid UTF-8 is replaced, not rejected.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.rpos..];
        let end = rest
            .iter()
            .take(MAX_CSTRING_LEN + 1)
            .position(|&b| b == 0)
            .ok_or(SessionError::MalformedField("unterminated string"))?;
        let value = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.rpos += end + 1;
        Ok(value)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.take(n).map(<[u8]>::to_vec)
    }

    /// Everything after the cursor, consumed.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.data[self.rpos..].to_vec();
        self.finish();
        rest
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.data.put_u8(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.data.put_u16_le(value);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.data.put_u32_le(value);
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.data.put_u64_le(value);
        self
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.data.put_f32_le(value);
        self
    }

    pub fn write_guid(&mut self, guid: ObjectGuid) -> &mut Self {
        self.write_u64(guid.raw())
    }

    pub fn write_packed_guid(&mut self, guid: ObjectGuid) -> &mut Self {
        let bytes = guid.raw().to_le_bytes();
        let mask = bytes
            .iter()
            .enumerate()
            .fold(0u8, |m, (i, b)| if *b != 0 { m | (1 << i) } else { m });
        self.data.put_u8(mask);
        for b in bytes.iter().filter(|b| **b != 0) {
            self.data.put_u8(*b);
        }
        self
    }

    pub fn write_cstring(&mut self, value: &str) -> &mut Self {
        self.data.put_slice(value.as_bytes());
        self.data.put_u8(0);
        self
    }

    pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.data.put_slice(value);
        self
    }
}

impl From<Vec<u8>> for CommandBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&bytes[..]),
            rpos: 0,
        }
    }
}

impl From<BytesMut> for CommandBuffer {
    fn from(data: BytesMut) -> Self {
        Self { data, rpos: 0 }
    }
}
