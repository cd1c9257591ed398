//! # Command Handlers
//!
//! [`standard_table`] wires every opcode the engine knows to its required
//! status, thread affinity and handler. The table is built once and shared
//! read-only by all sessions through their context.

pub mod item;
pub mod misc;
pub mod spell;

use crate::protocol::dispatcher::{Affinity, OpcodeTable, RequiredStatus};
use crate::protocol::opcodes::*;

pub fn standard_table() -> OpcodeTable {
    use Affinity::*;
    use RequiredStatus::*;

    OpcodeTable::builder()
        // never dispatched
        .register(MSG_NULL_ACTION, "MSG_NULL_ACTION", NeverAllowed, Inplace, misc::handle_null)
        .register(CMSG_AUTH_SESSION, "CMSG_AUTH_SESSION", NeverAllowed, ThreadUnsafe, misc::handle_early_processed)
        .register(CMSG_PING, "CMSG_PING", NeverAllowed, ThreadUnsafe, misc::handle_early_processed)
        .register(CMSG_CHAR_ENUM, "CMSG_CHAR_ENUM", Unimplemented, ThreadUnsafe, misc::handle_null)
        .register(CMSG_NAME_QUERY, "CMSG_NAME_QUERY", Unimplemented, ThreadUnsafe, misc::handle_null)
        .register(MSG_MOVE_HEARTBEAT, "MSG_MOVE_HEARTBEAT", Unimplemented, ThreadSafe, misc::handle_null)
        // server to client
        .register(SMSG_LOGOUT_RESPONSE, "SMSG_LOGOUT_RESPONSE", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_LOGOUT_COMPLETE, "SMSG_LOGOUT_COMPLETE", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_LOGOUT_CANCEL_ACK, "SMSG_LOGOUT_CANCEL_ACK", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_TUTORIAL_FLAGS, "SMSG_TUTORIAL_FLAGS", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_INVENTORY_CHANGE_FAILURE, "SMSG_INVENTORY_CHANGE_FAILURE", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_CAST_FAILED, "SMSG_CAST_FAILED", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_NOTIFICATION, "SMSG_NOTIFICATION", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_AUTH_RESPONSE, "SMSG_AUTH_RESPONSE", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_ACCOUNT_DATA_TIMES, "SMSG_ACCOUNT_DATA_TIMES", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_PET_ACTION_FEEDBACK, "SMSG_PET_ACTION_FEEDBACK", ServerOnly, Inplace, misc::handle_server_side)
        .register(SMSG_ADDON_INFO, "SMSG_ADDON_INFO", ServerOnly, Inplace, misc::handle_server_side)
        .register(
            SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION,
            "SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION",
            ServerOnly,
            Inplace,
            misc::handle_server_side,
        )
        // character select
        .register(CMSG_PLAYER_LOGIN, "CMSG_PLAYER_LOGIN", Authenticated, ThreadUnsafe, misc::handle_player_login)
        .register(
            CMSG_READY_FOR_ACCOUNT_DATA_TIMES,
            "CMSG_READY_FOR_ACCOUNT_DATA_TIMES",
            Authenticated,
            ThreadUnsafe,
            misc::handle_ready_for_account_data_times,
        )
        .register(CMSG_SET_ACTIVE_VOICE_CHANNEL, "CMSG_SET_ACTIVE_VOICE_CHANNEL", Authenticated, ThreadUnsafe, misc::handle_ignored)
        .register(CMSG_KEEP_ALIVE, "CMSG_KEEP_ALIVE", Authenticated, Inplace, misc::handle_ignored)
        // logout and relocation
        .register(CMSG_LOGOUT_REQUEST, "CMSG_LOGOUT_REQUEST", LoggedIn, ThreadUnsafe, misc::handle_logout_request)
        .register(CMSG_LOGOUT_CANCEL, "CMSG_LOGOUT_CANCEL", LoggedIn, ThreadUnsafe, misc::handle_logout_cancel)
        .register(MSG_MOVE_WORLDPORT_ACK, "MSG_MOVE_WORLDPORT_ACK", Transferring, ThreadUnsafe, misc::handle_worldport_ack)
        // tutorials
        .register(CMSG_TUTORIAL_FLAG, "CMSG_TUTORIAL_FLAG", LoggedIn, ThreadUnsafe, misc::handle_tutorial_flag)
        .register(CMSG_TUTORIAL_CLEAR, "CMSG_TUTORIAL_CLEAR", LoggedIn, ThreadUnsafe, misc::handle_tutorial_clear)
        .register(CMSG_TUTORIAL_RESET, "CMSG_TUTORIAL_RESET", LoggedIn, ThreadUnsafe, misc::handle_tutorial_reset)
        // items and spells
        .register(CMSG_USE_ITEM, "CMSG_USE_ITEM", LoggedIn, ThreadSafe, item::handle_use_item)
        .register(CMSG_CAST_SPELL, "CMSG_CAST_SPELL", LoggedIn, ThreadSafe, spell::handle_cast_spell)
        .register(CMSG_CANCEL_CAST, "CMSG_CANCEL_CAST", LoggedIn, ThreadSafe, spell::handle_cancel_cast)
        .register(CMSG_CANCEL_AURA, "CMSG_CANCEL_AURA", LoggedIn, ThreadSafe, spell::handle_cancel_aura)
        .register(CMSG_PET_CANCEL_AURA, "CMSG_PET_CANCEL_AURA", LoggedIn, ThreadSafe, spell::handle_pet_cancel_aura)
        .register(
            CMSG_CANCEL_AUTO_REPEAT_SPELL,
            "CMSG_CANCEL_AUTO_REPEAT_SPELL",
            LoggedIn,
            ThreadSafe,
            spell::handle_cancel_autorepeat,
        )
        .register(CMSG_CANCEL_CHANNELLING, "CMSG_CANCEL_CHANNELLING", LoggedIn, ThreadSafe, spell::handle_cancel_channelling)
        .register(CMSG_TOTEM_DESTROYED, "CMSG_TOTEM_DESTROYED", LoggedIn, ThreadSafe, spell::handle_totem_destroyed)
        .register(CMSG_SELF_RES, "CMSG_SELF_RES", LoggedIn, ThreadSafe, spell::handle_self_res)
        .register(
            CMSG_UPDATE_MISSILE_TRAJECTORY,
            "CMSG_UPDATE_MISSILE_TRAJECTORY",
            LoggedIn,
            ThreadSafe,
            spell::handle_update_missile_trajectory,
        )
        .register(
            CMSG_UPDATE_PROJECTILE_POSITION,
            "CMSG_UPDATE_PROJECTILE_POSITION",
            LoggedIn,
            ThreadSafe,
            spell::handle_update_projectile_position,
        )
        .build()
}
