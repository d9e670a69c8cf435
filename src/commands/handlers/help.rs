//! Help command handler
//!
//! Handles: help (`/hilfe` in German)
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{respond, SlashCommandHandler};
use crate::features::locale::Texts;

/// Lists every machine command plus host and uptime
pub struct HelpHandler {
    name: String,
}

#[async_trait]
impl SlashCommandHandler for HelpHandler {
    fn command_names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        respond(serenity_ctx, command, &Self::help_text(&ctx)).await
    }
}

impl HelpHandler {
    pub fn new(texts: Texts) -> Self {
        Self {
            name: texts.help_command(),
        }
    }

    pub fn help_text(ctx: &CommandContext) -> String {
        ctx.texts.help(
            &ctx.config.reminder_commands,
            &ctx.host_name,
            ctx.start_time,
            ctx.clock.now(),
        )
    }
}
