#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use realm_session::core::codec::CommandCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Arbitrary transport bytes must decode, wait for more, or error. Never panic.
    let mut src = BytesMut::from(data);
    while let Ok(Some(_)) = CommandCodec.decode(&mut src) {}
});
