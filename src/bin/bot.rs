use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;

use chorebell::commands::{
    create_all_handlers, register_global_commands, register_guild_commands, CommandContext,
    CommandRegistry,
};
use chorebell::core::Config;
use chorebell::features::analytics::StatsRecorder;
use chorebell::features::locale::Texts;
use chorebell::features::reminders::{Clock, ReminderScheduler, ReminderStore, SystemClock};
use chorebell::gateway::DiscordGateway;

struct Handler {
    config: Arc<Config>,
    gateway: DiscordGateway,
    registry: CommandRegistry,
    command_ctx: Arc<CommandContext>,
    guild_id: Option<GuildId>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        self.gateway.handle_message(&msg);
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        let registered = match self.guild_id {
            Some(guild_id) => register_guild_commands(&ctx, guild_id, &self.config).await,
            None => register_global_commands(&ctx, &self.config).await,
        };
        if let Err(e) = registered {
            error!("Failed to register slash commands: {e}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };
        info!(
            "Slash command /{} from {} in channel {}",
            command.data.name, command.user.name, command.channel_id
        );

        let Some(handler) = self.registry.get(&command.data.name) else {
            error!("No handler registered for /{}", command.data.name);
            return;
        };

        if let Err(e) = handler
            .handle(self.command_ctx.clone(), &ctx, &command)
            .await
        {
            error!(
                "Error handling slash command '{}': {}",
                command.data.name, e
            );

            let error_message = self.command_ctx.texts.error_notice();
            if let Err(why) = command
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content(error_message))
                })
                .await
            {
                error!("Failed to send error message: {why}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Arc::new(Config::from_env()?);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.runtime.log_level),
    )
    .init();

    info!("Starting chorebell...");

    let texts = Texts::new(config.locale);
    info!("⌨️ Commands ({}):", config.locale);
    for machine in &config.reminder_commands {
        let names = texts.command_names(machine);
        info!(
            "   - {} ({} min): /{}, /{}, /{}",
            machine.display_name(config.locale),
            machine.wait_time_in_min,
            names.start,
            names.status,
            names.stop
        );
    }
    info!("   - /{}", texts.help_command());
    if config.require_reply_number_of_reminder_messages > 0 {
        info!(
            "🔁 Escalation: {} nudge(s) every {} min",
            config.require_reply_number_of_reminder_messages,
            config.require_reply_time_between_reminder_messages_in_min
        );
    } else {
        info!("🔁 Escalation disabled");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(ReminderStore::open(&config.runtime.reminders_path).await?);
    let stats = Arc::new(StatsRecorder::open(&config.runtime.stats_path, clock.clone()).await?);

    let http = Arc::new(Http::new(&config.token));
    let gateway = DiscordGateway::new(http);
    let scheduler = ReminderScheduler::from_config(
        &config,
        store,
        stats.clone(),
        Arc::new(gateway.clone()),
        clock.clone(),
    );
    scheduler.restore().await?;

    let mut registry = CommandRegistry::new();
    for handler in create_all_handlers(&config) {
        registry.register(handler);
    }

    let command_ctx = Arc::new(CommandContext::new(
        config.clone(),
        scheduler,
        stats,
        clock,
    ));

    // Parse guild ID if provided for development mode
    let guild_id = config.runtime.discord_guild_id.map(GuildId);

    let handler = Handler {
        config: config.clone(),
        gateway,
        registry,
        command_ctx,
        guild_id,
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES;

    let mut client = Client::builder(&config.token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("Client error: {why:?}");
        return Err(why.into());
    }

    Ok(())
}
