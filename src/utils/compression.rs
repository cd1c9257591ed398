use crate::error::{Result, SessionError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compresses data as a zlib stream
///
/// # Errors
/// Returns `SessionError::Io` if the encoder fails
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflates a zlib stream, refusing to produce more than `limit` bytes.
///
/// The limit is checked on every chunk so a small hostile stream cannot
/// expand into an unbounded allocation.
///
/// # Errors
/// Returns `SessionError::DecompressionFailure` if:
/// - the stream is corrupt or truncated
/// - output size exceeds `limit`
pub fn decompress(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut reader = ZlibDecoder::new(data);
    let mut out = Vec::new();
    let mut buffer = [0u8; 8192];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                out.extend_from_slice(&buffer[..n]);
                if out.len() > limit {
                    return Err(SessionError::DecompressionFailure);
                }
            }
            Err(_) => return Err(SessionError::DecompressionFailure),
        }
    }
    Ok(out)
}
