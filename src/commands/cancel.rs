//! `/cancel`: abandons every open flow

use async_trait::async_trait;

use crate::dialog::{Command, CommandResult, Context};

pub struct CancelCommand;

#[async_trait]
impl Command for CancelCommand {
    fn name(&self) -> &str {
        "cancel"
    }

    fn description(&self) -> Option<&str> {
        Some("leave the current flow")
    }

    async fn on_command(&self, ctx: &mut Context<'_>, _command: &str) -> CommandResult {
        if ctx.session.is_empty() {
            return ctx.reply("Nothing to cancel.").await;
        }
        let depth = ctx.session.depth();
        ctx.session.clear();
        log::debug!("User {} cancelled {} page(s)", ctx.session.user_id(), depth);
        ctx.reply("Cancelled.").await
    }
}
