//! Client addon metadata carried in the authentication request, and the
//! addon-info reply.
//!
//! ```text
//! [DeclaredSize(4)] [zlib stream]
//!     inflated: [Count(4)] { [Name(cstring)] [Enabled(1)] [Crc(4)] [Unk(4)] }* [Unk(4)]
//! ```

use crate::core::buffer::CommandBuffer;
use crate::core::command::OutboundPacket;
use crate::error::{constants, Result, SessionError};
use crate::protocol::opcodes::SMSG_ADDON_INFO;
use crate::utils::compression;
use tracing::{debug, warn};

/// Largest inflated addon blob accepted.
pub const MAX_ADDON_INFO_SIZE: u32 = 0xFFFFF;

/// CRC the client reports for addons shipped with the game.
pub const STANDARD_ADDON_CRC: u32 = 0x4C1C_776D;

/// Signing key the client needs to verify a non-standard addon.
const ADDON_PUBLIC_KEY: [u8; 256] = [
    0xC3, 0x5B, 0x50, 0x84, 0xB9, 0x3E, 0x32, 0x42, 0x8C, 0xD0, 0xC7, 0x48, 0xFA, 0x0E, 0x5D, 0x54,
    0x5A, 0xA3, 0x0E, 0x14, 0xBA, 0x9E, 0x0D, 0xB9, 0x5D, 0x8B, 0xEE, 0xB6, 0x84, 0x93, 0x45, 0x75,
    0xFF, 0x31, 0xFE, 0x2F, 0x64, 0x3F, 0x3D, 0x6D, 0x07, 0xD9, 0x44, 0x9B, 0x40, 0x85, 0x59, 0x34,
    0x4E, 0x10, 0xE1, 0xE7, 0x43, 0x69, 0xEF, 0x7C, 0x16, 0xFC, 0xB4, 0xED, 0x1B, 0x95, 0x28, 0xA8,
    0x23, 0x76, 0x51, 0x31, 0x57, 0x30, 0x2B, 0x79, 0x08, 0x50, 0x10, 0x1C, 0x4A, 0x1A, 0x2C, 0xC8,
    0x8B, 0x8F, 0x05, 0x2D, 0x22, 0x3D, 0xDB, 0x5A, 0x24, 0x7A, 0x0F, 0x13, 0x50, 0x37, 0x8F, 0x5A,
    0xCC, 0x9E, 0x04, 0x44, 0x0E, 0x87, 0x01, 0xD4, 0xA3, 0x15, 0x94, 0x16, 0x34, 0xC6, 0xC2, 0xC3,
    0xFB, 0x49, 0xFE, 0xE1, 0xF9, 0xDA, 0x8C, 0x50, 0x3C, 0xBE, 0x2C, 0xBB, 0x57, 0xED, 0x46, 0xB9,
    0xAD, 0x8B, 0xC6, 0xDF, 0x0E, 0xD6, 0x0F, 0xBE, 0x80, 0xB3, 0x8B, 0x1E, 0x77, 0xCF, 0xAD, 0x22,
    0xCF, 0xB7, 0x4B, 0xCF, 0xFB, 0xF0, 0x6B, 0x11, 0x45, 0x2D, 0x7A, 0x81, 0x18, 0xF2, 0x92, 0x7E,
    0x98, 0x56, 0x5D, 0x5E, 0x69, 0x72, 0x0A, 0x0D, 0x03, 0x0A, 0x85, 0xA2, 0x85, 0x9C, 0xCB, 0xFB,
    0x56, 0x6E, 0x8F, 0x44, 0xBB, 0x8F, 0x02, 0x22, 0x68, 0x63, 0x97, 0xBC, 0x85, 0xBA, 0xA8, 0xF7,
    0xB5, 0x40, 0x68, 0x3C, 0x77, 0x86, 0x6F, 0x4B, 0xD7, 0x88, 0xCA, 0x8A, 0xD7, 0xCE, 0x36, 0xF0,
    0x45, 0x6E, 0xD5, 0x64, 0x79, 0x0F, 0x17, 0xFC, 0x64, 0xDD, 0x10, 0x6F, 0xF3, 0xF5, 0xE0, 0xA6,
    0xC3, 0xFB, 0x1B, 0x8C, 0x29, 0xEF, 0x8E, 0xE5, 0x34, 0xCB, 0xD1, 0x2A, 0xCE, 0x79, 0xC3, 0x9A,
    0x0D, 0x36, 0xEA, 0x01, 0xE0, 0xAA, 0x91, 0x20, 0x54, 0xF0, 0x72, 0xD8, 0x1E, 0xC7, 0x89, 0xD2,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonRecord {
    pub name: String,
    pub enabled: u8,
    pub crc: u32,
}

impl AddonRecord {
    pub fn is_standard(&self) -> bool {
        self.crc == STANDARD_ADDON_CRC
    }
}

/// Parse the addon blob that trails the authentication request.
///
/// An empty payload or a zero declared size yields no addons. A stream that
/// fails to inflate yields none either. A truncated body keeps the records
/// read before the cut.
pub fn parse_addon_blob(buf: &mut CommandBuffer) -> Result<Vec<AddonRecord>> {
    if buf.remaining() < 4 {
        return Ok(Vec::new());
    }
    let declared = buf.read_u32()?;
    if declared == 0 {
        return Ok(Vec::new());
    }
    if declared > MAX_ADDON_INFO_SIZE {
        return Err(SessionError::AddonBlob(constants::ERR_ADDON_BLOB_TOO_LARGE));
    }

    let inflated = match compression::decompress(&buf.read_rest(), declared as usize) {
        Ok(inflated) => inflated,
        Err(e) => {
            warn!(declared, error = %e, "Addon blob failed to inflate");
            return Ok(Vec::new());
        }
    };
    let mut body = CommandBuffer::from(inflated);

    let Ok(count) = body.read_u32() else {
        debug!("Addon blob has no record count");
        return Ok(Vec::new());
    };
    let mut addons = Vec::new();
    for _ in 0..count {
        match read_record(&mut body) {
            Ok(addon) => {
                debug!(addon = %addon.name, enabled = addon.enabled, crc = format_args!("{:#x}", addon.crc), "Addon reported");
                addons.push(addon);
            }
            Err(_) => {
                warn!(parsed = addons.len(), count, "Addon blob truncated");
                return Ok(addons);
            }
        }
    }
    if body.read_u32().is_err() {
        debug!("Addon blob missing trailer");
    } else if body.remaining() != 0 {
        debug!(unread = body.remaining(), "Addon blob under-read");
    }
    Ok(addons)
}

fn read_record(body: &mut CommandBuffer) -> Result<AddonRecord> {
    let name = body.read_cstring()?;
    let enabled = body.read_u8()?;
    let crc = body.read_u32()?;
    let _unk = body.read_u32()?;
    Ok(AddonRecord { name, enabled, crc })
}

/// Build the addon-info reply for the addons reported at login.
pub fn build_addon_info(addons: &[AddonRecord]) -> OutboundPacket {
    let mut data = CommandBuffer::with_capacity(4 + addons.len() * 8);
    for addon in addons {
        data.write_u8(2); // state
        data.write_u8(1); // crc block follows
        let needs_key = !addon.is_standard();
        data.write_u8(needs_key as u8);
        if needs_key {
            data.write_bytes(&ADDON_PUBLIC_KEY);
        }
        data.write_u32(0);
        data.write_u8(0); // no url
    }
    data.write_u32(0); // banned addon count
    OutboundPacket::new(SMSG_ADDON_INFO, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::unwrap_used)]
    fn blob(records: &[(&str, u8, u32)]) -> CommandBuffer {
        let mut body = CommandBuffer::new();
        body.write_u32(records.len() as u32);
        for (name, enabled, crc) in records {
            body.write_cstring(name).write_u8(*enabled).write_u32(*crc).write_u32(0);
        }
        body.write_u32(0);
        let raw = body.as_slice().to_vec();

        let mut out = CommandBuffer::new();
        out.write_u32(raw.len() as u32);
        out.write_bytes(&compression::compress(&raw).unwrap());
        out
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parses_records_from_compressed_blob() {
        let mut buf = blob(&[
            ("Blizzard_AuctionUI", 1, STANDARD_ADDON_CRC),
            ("Recount", 1, 0x1234),
        ]);
        let addons = parse_addon_blob(&mut buf).unwrap();
        assert_eq!(addons.len(), 2);
        assert_eq!(addons[1].name, "Recount");
        assert!(addons[0].is_standard());
        assert!(!addons[1].is_standard());
    }

    #[test]
    fn rejects_declared_size_over_limit() {
        let mut buf = CommandBuffer::new();
        buf.write_u32(MAX_ADDON_INFO_SIZE + 1).write_bytes(&[0x78, 0x9c]);
        assert!(matches!(
            parse_addon_blob(&mut buf),
            Err(SessionError::AddonBlob(_))
        ));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn empty_payload_has_no_addons() {
        let mut buf = CommandBuffer::new();
        assert!(parse_addon_blob(&mut buf).unwrap().is_empty());
        buf.write_u32(0);
        assert!(parse_addon_blob(&mut buf).unwrap().is_empty());
    }

    #[test]
    fn reply_includes_key_only_for_custom_addons() {
        let standard = AddonRecord {
            name: "Blizzard_RaidUI".into(),
            enabled: 1,
            crc: STANDARD_ADDON_CRC,
        };
        let custom = AddonRecord {
            name: "Omen".into(),
            enabled: 1,
            crc: 7,
        };
        // state, crc flag, key flag, u32, url flag
        let standard_len = 1 + 1 + 1 + 4 + 1;
        assert_eq!(build_addon_info(&[standard.clone()]).body.len(), standard_len + 4);
        assert_eq!(
            build_addon_info(&[standard, custom]).body.len(),
            standard_len * 2 + 256 + 4
        );
    }

    #[allow(clippy::unwrap_used)]
    fn raw_blob(body: &[u8]) -> CommandBuffer {
        let mut out = CommandBuffer::new();
        out.write_u32(body.len() as u32);
        out.write_bytes(&compression::compress(body).unwrap());
        out
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn truncated_body_keeps_earlier_records() {
        let mut body = CommandBuffer::new();
        body.write_u32(3);
        body.write_cstring("Recount").write_u8(1).write_u32(0x1234).write_u32(0);
        body.write_cstring("Omen").write_u8(1).write_u32(0x77);
        let mut buf = raw_blob(body.as_slice());

        let addons = parse_addon_blob(&mut buf).unwrap();
        assert_eq!(addons.len(), 1);
        assert_eq!(addons[0].name, "Recount");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn missing_trailer_keeps_records() {
        let mut body = CommandBuffer::new();
        body.write_u32(1);
        body.write_cstring("Recount").write_u8(0).write_u32(0x1234).write_u32(0);
        let mut buf = raw_blob(body.as_slice());

        let addons = parse_addon_blob(&mut buf).unwrap();
        assert_eq!(addons.len(), 1);
        assert_eq!(addons[0].enabled, 0);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn stream_that_fails_to_inflate_has_no_addons() {
        let mut buf = CommandBuffer::new();
        buf.write_u32(64).write_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(parse_addon_blob(&mut buf).unwrap().is_empty());
    }
}
