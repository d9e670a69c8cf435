//! Machine reminder command handlers
//!
//! Handles: start, status and stop for one configured machine, e.g.
//! `/startlaundry`, `/statuslaundry`, `/stoplaundry`
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Start replaces a running reminder and reports the stop
//! - 1.0.0: Initial implementation

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{respond, SlashCommandHandler};
use crate::core::config::ReminderCommandDef;
use crate::core::ids::{ChatId, UserId};
use crate::features::analytics::StatsEvent;
use crate::features::locale::{MachineCommands, Texts};
use crate::features::reminders::StopOutcome;

/// Milliseconds between the Unix epoch and the Discord epoch (2015-01-01)
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a Discord snowflake id
pub fn snowflake_time(id: u64) -> Option<DateTime<Utc>> {
    let millis = (id >> 22) + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(i64::try_from(millis).ok()?).single()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineAction {
    Start,
    Status,
    Stop,
}

/// Handler for the three commands of one machine
pub struct MachineHandler {
    machine: ReminderCommandDef,
    commands: MachineCommands,
}

#[async_trait]
impl SlashCommandHandler for MachineHandler {
    fn command_names(&self) -> Vec<String> {
        vec![
            self.commands.start.clone(),
            self.commands.status.clone(),
            self.commands.stop.clone(),
        ]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let Some(action) = self.action(&command.data.name) else {
            return Ok(());
        };
        let chat_id = command.channel_id.0;
        let user_id = command.user.id.0;

        let text = match action {
            MachineAction::Start => {
                let reference_time =
                    snowflake_time(command.id.0).unwrap_or_else(|| ctx.clock.now());
                self.start_text(&ctx, chat_id, user_id, &command.user.name, reference_time)
                    .await?
            }
            MachineAction::Status => self.status_text(&ctx, chat_id).await?,
            MachineAction::Stop => self.stop_text(&ctx, chat_id, user_id).await?,
        };
        respond(serenity_ctx, command, &text).await
    }
}

impl MachineHandler {
    pub fn new(machine: ReminderCommandDef, texts: Texts) -> Self {
        let commands = texts.command_names(&machine);
        Self { machine, commands }
    }

    pub fn action(&self, name: &str) -> Option<MachineAction> {
        if name == self.commands.start {
            Some(MachineAction::Start)
        } else if name == self.commands.status {
            Some(MachineAction::Status)
        } else if name == self.commands.stop {
            Some(MachineAction::Stop)
        } else {
            None
        }
    }

    /// Start (or restart) the reminder and build the confirmation
    pub async fn start_text(
        &self,
        ctx: &CommandContext,
        chat_id: ChatId,
        user_id: UserId,
        user_name: &str,
        reference_time: DateTime<Utc>,
    ) -> Result<String> {
        let machine_type = &self.machine.id;
        let mut text = String::new();
        if let StopOutcome::Stopped(previous) =
            ctx.scheduler.stop(chat_id, user_id, machine_type).await?
        {
            text.push_str(&ctx.texts.stopped(&self.machine, previous.start_time));
            text.push_str("\n\n");
        }

        let started = ctx
            .stats
            .record(chat_id, user_id, machine_type, StatsEvent::Started)
            .await?;
        let outcome = ctx
            .scheduler
            .start(chat_id, machine_type, reference_time)
            .await?;
        info!("{user_name} ({user_id}) started {machine_type} in chat {chat_id}");

        text.push_str(&ctx.texts.start_confirmation(
            &self.machine,
            user_name,
            outcome.due_at,
            started,
        ));
        Ok(text)
    }

    pub async fn status_text(&self, ctx: &CommandContext, chat_id: ChatId) -> Result<String> {
        let text = match ctx.scheduler.status(chat_id, &self.machine.id).await? {
            Some(status) => {
                ctx.texts
                    .status_found(&self.machine, status.reminder.start_time, status.due_at)
            }
            None => ctx.texts.not_found(&self.machine),
        };
        Ok(text)
    }

    pub async fn stop_text(
        &self,
        ctx: &CommandContext,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<String> {
        let text = match ctx.scheduler.stop(chat_id, user_id, &self.machine.id).await? {
            StopOutcome::Stopped(reminder) => {
                info!("{user_id} stopped {} in chat {chat_id}", self.machine.id);
                ctx.texts.stopped(&self.machine, reminder.start_time)
            }
            StopOutcome::NotFound => ctx.texts.not_found(&self.machine),
        };
        Ok(text)
    }
}
