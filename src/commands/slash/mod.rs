//! # Slash Commands (/)
//!
//! Discord slash command definitions generated from the configured machines.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

mod machine;

use anyhow::Result;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::Command;
use serenity::model::id::GuildId;
use serenity::prelude::Context;

use crate::core::config::Config;
use crate::features::locale::Texts;

/// Creates all slash command definitions: three per machine plus help
pub fn create_slash_commands(config: &Config) -> Vec<CreateApplicationCommand> {
    let texts = Texts::new(config.locale);
    let mut commands: Vec<CreateApplicationCommand> = config
        .reminder_commands
        .iter()
        .flat_map(|m| machine::create_commands(m, texts))
        .collect();
    commands.push(machine::create_help_command(texts));
    commands
}

/// Registers all slash commands globally
pub async fn register_global_commands(ctx: &Context, config: &Config) -> Result<()> {
    let slash_commands = create_slash_commands(config);
    let count = slash_commands.len();

    Command::set_global_application_commands(&ctx.http, |commands| {
        for command in slash_commands {
            commands.add_application_command(command);
        }
        commands
    })
    .await?;

    info!("Global slash commands registered successfully ({count} commands)");
    Ok(())
}

/// Registers all slash commands for a specific guild (faster for testing)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId, config: &Config) -> Result<()> {
    let slash_commands = create_slash_commands(config);
    let count = slash_commands.len();

    guild_id
        .set_application_commands(&ctx.http, |commands| {
            for command in slash_commands {
                commands.add_application_command(command);
            }
            commands
        })
        .await?;

    info!("Guild slash commands registered for guild {guild_id} ({count} commands)");
    Ok(())
}
