//! Commands and actions shared by every workflow.

use async_trait::async_trait;
use seaman_core::command::Arguments;
use tracing::info;

use super::{ActionContext, ActionHandler, CommandContext, CommandHandler, Reply};
use crate::error::HandlerError;
use crate::formatter;

/// `help`: lists registered commands in registration order.
pub struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn handle(
        &self,
        ctx: &CommandContext<'_>,
        _args: &Arguments,
    ) -> Result<Reply, HandlerError> {
        Ok(Reply::Message(formatter::command_list(ctx.commands.list())))
    }
}

/// `version`: the running build's version.
pub struct Version;

#[async_trait]
impl CommandHandler for Version {
    async fn handle(
        &self,
        _ctx: &CommandContext<'_>,
        _args: &Arguments,
    ) -> Result<Reply, HandlerError> {
        Ok(Reply::Message(formatter::version(env!("CARGO_PKG_VERSION"))))
    }
}

/// `common_cancel`: ends whatever workflow the message was in.
pub struct Cancel;

#[async_trait]
impl ActionHandler for Cancel {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<Reply, HandlerError> {
        info!(user = %ctx.event.sender_id, "Workflow cancelled");
        Ok(Reply::Update(formatter::cancelled(&ctx.event.sender_id)))
    }
}
