#![no_main]

use libfuzzer_sys::fuzz_target;
use realm_session::core::buffer::CommandBuffer;
use realm_session::core::guid::{HighGuid, ObjectGuid};
use realm_session::core::targets::{SpellCastTargets, Trajectory};

fuzz_target!(|data: &[u8]| {
    let caster = ObjectGuid::new(HighGuid::Player, 1);
    let mut buf = CommandBuffer::from_slice(data);
    let Ok(cast_flags) = buf.read_u8() else {
        return;
    };
    if SpellCastTargets::read_for_caster(&mut buf, caster).is_ok() {
        let _ = Trajectory::read_if_flagged(&mut buf, cast_flags);
    }
});
