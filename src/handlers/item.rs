use crate::core::command::Command;
use crate::error::Result;
use crate::session::Session;
use crate::validation::{validate_item_use, ItemUseOutcome};
use tracing::debug;

/// `CMSG_USE_ITEM`: run the item-use chain and hand the action over.
pub fn handle_use_item(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    let ctx = session.context();
    match validate_item_use(&ctx.services, player, &mut command.payload)? {
        ItemUseOutcome::Prepared(request) => {
            ctx.metrics.action_prepared();
            ctx.services.casts.prepare(request);
        }
        ItemUseOutcome::Scripted => {
            debug!(%player, "Item use handled by script");
        }
    }
    Ok(())
}
