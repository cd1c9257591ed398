//! Session-level commands: login, logout, relocation acks, tutorials,
//! account data, and the placeholder handlers for opcodes that never reach
//! a real handler.

use crate::core::command::{Command, OutboundPacket};
use crate::error::Result;
use crate::protocol::opcodes;
use crate::session::account::GLOBAL_CACHE_MASK;
use crate::session::Session;
use tracing::{debug, error};

pub fn handle_player_login(session: &mut Session, command: &mut Command) -> Result<()> {
    let character = command.payload.read_guid()?;
    session.login_player(character)
}

pub fn handle_logout_request(session: &mut Session, _command: &mut Command) -> Result<()> {
    session.handle_logout_request()
}

pub fn handle_logout_cancel(session: &mut Session, _command: &mut Command) -> Result<()> {
    session.cancel_logout();
    session.send(OutboundPacket::empty(opcodes::SMSG_LOGOUT_CANCEL_ACK));
    debug!(account = session.account_id(), "Logout cancelled");
    Ok(())
}

pub fn handle_worldport_ack(session: &mut Session, _command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    session.services().actors.acknowledge_relocation(player);
    Ok(())
}

pub fn handle_tutorial_flag(session: &mut Session, command: &mut Command) -> Result<()> {
    let flag = command.payload.read_u32()?;
    if !session.tutorials_mut().mark_seen(flag) {
        debug!(flag, "Tutorial flag out of range");
    }
    Ok(())
}

pub fn handle_tutorial_clear(session: &mut Session, _command: &mut Command) -> Result<()> {
    session.tutorials_mut().fill(u32::MAX);
    Ok(())
}

pub fn handle_tutorial_reset(session: &mut Session, _command: &mut Command) -> Result<()> {
    session.tutorials_mut().fill(0);
    Ok(())
}

pub fn handle_ready_for_account_data_times(session: &mut Session, _command: &mut Command) -> Result<()> {
    session.send_account_data_times(GLOBAL_CACHE_MASK);
    Ok(())
}

/// Accepted and ignored.
pub fn handle_ignored(_session: &mut Session, _command: &mut Command) -> Result<()> {
    Ok(())
}

pub fn handle_null(session: &mut Session, command: &mut Command) -> Result<()> {
    error!(
        account = session.account_id(),
        opcode = %command.opcode(),
        name = opcodes::name_of(command.opcode()),
        "Received unhandled opcode"
    );
    command.payload.finish();
    Ok(())
}

/// Opcodes the transport consumes before a session exists.
pub fn handle_early_processed(session: &mut Session, command: &mut Command) -> Result<()> {
    error!(
        account = session.account_id(),
        opcode = %command.opcode(),
        name = opcodes::name_of(command.opcode()),
        "Received opcode that should have been processed earlier"
    );
    command.payload.finish();
    Ok(())
}

pub fn handle_server_side(session: &mut Session, command: &mut Command) -> Result<()> {
    error!(
        account = session.account_id(),
        opcode = %command.opcode(),
        name = opcodes::name_of(command.opcode()),
        "Received server-side opcode"
    );
    command.payload.finish();
    Ok(())
}
