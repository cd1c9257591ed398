//! Opcode identifiers understood by the session engine.

use crate::core::command::Opcode;

pub const MSG_NULL_ACTION: Opcode = Opcode(0x000);
pub const CMSG_CHAR_ENUM: Opcode = Opcode(0x037);
pub const CMSG_PLAYER_LOGIN: Opcode = Opcode(0x03D);
pub const CMSG_LOGOUT_REQUEST: Opcode = Opcode(0x04B);
pub const SMSG_LOGOUT_RESPONSE: Opcode = Opcode(0x04C);
pub const SMSG_LOGOUT_COMPLETE: Opcode = Opcode(0x04D);
pub const CMSG_LOGOUT_CANCEL: Opcode = Opcode(0x04E);
pub const SMSG_LOGOUT_CANCEL_ACK: Opcode = Opcode(0x04F);
pub const CMSG_NAME_QUERY: Opcode = Opcode(0x050);
pub const CMSG_USE_ITEM: Opcode = Opcode(0x0AB);
pub const MSG_MOVE_WORLDPORT_ACK: Opcode = Opcode(0x0DC);
pub const MSG_MOVE_HEARTBEAT: Opcode = Opcode(0x0EE);
pub const SMSG_TUTORIAL_FLAGS: Opcode = Opcode(0x0FD);
pub const CMSG_TUTORIAL_FLAG: Opcode = Opcode(0x0FE);
pub const CMSG_TUTORIAL_CLEAR: Opcode = Opcode(0x0FF);
pub const CMSG_TUTORIAL_RESET: Opcode = Opcode(0x100);
pub const SMSG_INVENTORY_CHANGE_FAILURE: Opcode = Opcode(0x112);
pub const CMSG_CAST_SPELL: Opcode = Opcode(0x12E);
pub const CMSG_CANCEL_CAST: Opcode = Opcode(0x12F);
pub const SMSG_CAST_FAILED: Opcode = Opcode(0x130);
pub const CMSG_CANCEL_AURA: Opcode = Opcode(0x136);
pub const CMSG_CANCEL_CHANNELLING: Opcode = Opcode(0x13B);
pub const SMSG_NOTIFICATION: Opcode = Opcode(0x1CB);
pub const CMSG_PING: Opcode = Opcode(0x1DC);
pub const CMSG_AUTH_SESSION: Opcode = Opcode(0x1ED);
pub const SMSG_AUTH_RESPONSE: Opcode = Opcode(0x1EE);
pub const SMSG_ACCOUNT_DATA_TIMES: Opcode = Opcode(0x209);
pub const CMSG_PET_CANCEL_AURA: Opcode = Opcode(0x26B);
pub const CMSG_CANCEL_AUTO_REPEAT_SPELL: Opcode = Opcode(0x26D);
pub const SMSG_PET_ACTION_FEEDBACK: Opcode = Opcode(0x2C6);
pub const CMSG_SELF_RES: Opcode = Opcode(0x2B3);
pub const SMSG_ADDON_INFO: Opcode = Opcode(0x2EF);
pub const CMSG_SET_ACTIVE_VOICE_CHANNEL: Opcode = Opcode(0x3D3);
pub const CMSG_KEEP_ALIVE: Opcode = Opcode(0x407);
pub const CMSG_TOTEM_DESTROYED: Opcode = Opcode(0x41F);
pub const CMSG_UPDATE_MISSILE_TRAJECTORY: Opcode = Opcode(0x462);
pub const SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION: Opcode = Opcode(0x4BD);
pub const CMSG_UPDATE_PROJECTILE_POSITION: Opcode = Opcode(0x4BE);
pub const CMSG_READY_FOR_ACCOUNT_DATA_TIMES: Opcode = Opcode(0x4FF);

const NAMES: &[(Opcode, &str)] = &[
    (MSG_NULL_ACTION, "MSG_NULL_ACTION"),
    (CMSG_CHAR_ENUM, "CMSG_CHAR_ENUM"),
    (CMSG_PLAYER_LOGIN, "CMSG_PLAYER_LOGIN"),
    (CMSG_LOGOUT_REQUEST, "CMSG_LOGOUT_REQUEST"),
    (SMSG_LOGOUT_RESPONSE, "SMSG_LOGOUT_RESPONSE"),
    (SMSG_LOGOUT_COMPLETE, "SMSG_LOGOUT_COMPLETE"),
    (CMSG_LOGOUT_CANCEL, "CMSG_LOGOUT_CANCEL"),
    (SMSG_LOGOUT_CANCEL_ACK, "SMSG_LOGOUT_CANCEL_ACK"),
    (CMSG_NAME_QUERY, "CMSG_NAME_QUERY"),
    (CMSG_USE_ITEM, "CMSG_USE_ITEM"),
    (MSG_MOVE_WORLDPORT_ACK, "MSG_MOVE_WORLDPORT_ACK"),
    (MSG_MOVE_HEARTBEAT, "MSG_MOVE_HEARTBEAT"),
    (SMSG_TUTORIAL_FLAGS, "SMSG_TUTORIAL_FLAGS"),
    (CMSG_TUTORIAL_FLAG, "CMSG_TUTORIAL_FLAG"),
    (CMSG_TUTORIAL_CLEAR, "CMSG_TUTORIAL_CLEAR"),
    (CMSG_TUTORIAL_RESET, "CMSG_TUTORIAL_RESET"),
    (SMSG_INVENTORY_CHANGE_FAILURE, "SMSG_INVENTORY_CHANGE_FAILURE"),
    (CMSG_CAST_SPELL, "CMSG_CAST_SPELL"),
    (CMSG_CANCEL_CAST, "CMSG_CANCEL_CAST"),
    (SMSG_CAST_FAILED, "SMSG_CAST_FAILED"),
    (CMSG_CANCEL_AURA, "CMSG_CANCEL_AURA"),
    (CMSG_CANCEL_CHANNELLING, "CMSG_CANCEL_CHANNELLING"),
    (SMSG_NOTIFICATION, "SMSG_NOTIFICATION"),
    (CMSG_PING, "CMSG_PING"),
    (CMSG_AUTH_SESSION, "CMSG_AUTH_SESSION"),
    (SMSG_AUTH_RESPONSE, "SMSG_AUTH_RESPONSE"),
    (SMSG_ACCOUNT_DATA_TIMES, "SMSG_ACCOUNT_DATA_TIMES"),
    (CMSG_PET_CANCEL_AURA, "CMSG_PET_CANCEL_AURA"),
    (CMSG_CANCEL_AUTO_REPEAT_SPELL, "CMSG_CANCEL_AUTO_REPEAT_SPELL"),
    (SMSG_PET_ACTION_FEEDBACK, "SMSG_PET_ACTION_FEEDBACK"),
    (CMSG_SELF_RES, "CMSG_SELF_RES"),
    (SMSG_ADDON_INFO, "SMSG_ADDON_INFO"),
    (CMSG_SET_ACTIVE_VOICE_CHANNEL, "CMSG_SET_ACTIVE_VOICE_CHANNEL"),
    (CMSG_KEEP_ALIVE, "CMSG_KEEP_ALIVE"),
    (CMSG_TOTEM_DESTROYED, "CMSG_TOTEM_DESTROYED"),
    (CMSG_UPDATE_MISSILE_TRAJECTORY, "CMSG_UPDATE_MISSILE_TRAJECTORY"),
    (
        SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION,
        "SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION",
    ),
    (CMSG_UPDATE_PROJECTILE_POSITION, "CMSG_UPDATE_PROJECTILE_POSITION"),
    (
        CMSG_READY_FOR_ACCOUNT_DATA_TIMES,
        "CMSG_READY_FOR_ACCOUNT_DATA_TIMES",
    ),
];

/// Human-readable name for logs.
pub fn name_of(opcode: Opcode) -> &'static str {
    NAMES
        .iter()
        .find(|(op, _)| *op == opcode)
        .map(|(_, name)| *name)
        .unwrap_or("UNKNOWN_OPCODE")
}
