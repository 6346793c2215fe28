// This is the entry point of the CTF event bot.
//
// **Architecture Overview:**
// - `core/` = CTF lifecycle logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite)
// - `discord/` = Discord-specific adapters (commands, events, platform)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::ctf::{CtfConfig, CtfService, StatusTracker};
use crate::discord::ctf::{router, DiscordPlatform};
use crate::discord::{Data, Error};
use crate::infra::ctf::SqliteCtfStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/ctf.db";

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Ready { data_about_bot } = event {
        tracing::info!("Logged in as {}", data_about_bot.user.name);
    }

    router::handle_event(ctx, event, data).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = std::env::var("DISCORD_TOKEN")
        .context("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")?;
    let guild_id: u64 = std::env::var("GUILD_ID")
        .context("Missing GUILD_ID environment variable")?
        .trim()
        .parse()
        .context("GUILD_ID must be a numeric Discord id")?;
    let guild_id = serenity::GuildId::new(guild_id);

    let config = CtfConfig::from_env()?;
    tracing::info!(
        admin_roles = config.admin_role_ids.len(),
        announcement_channel = ?config.announcement_channel_id,
        archive_category = ?config.archive_category_id,
        "Loaded CTF configuration"
    );

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // The store is ready now; the platform needs the client's HTTP handle, so
    // the service is assembled in `setup`.

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let store = SqliteCtfStore::new(&database_url)
        .await
        .with_context(|| format!("Failed to initialize SQLite store at {database_url}"))?;
    let status_tracker = Arc::new(StatusTracker::new());

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_SCHEDULED_EVENTS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![discord::commands::ctf_event::ctf_event()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(router::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("🤖 Bot is starting up...");

                // Single-guild bot: guild registration is instant.
                poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                    .await?;
                tracing::info!("✅ Commands registered!");

                let platform = DiscordPlatform::new(ctx.http.clone(), guild_id);
                let data = Data {
                    ctf: Arc::new(CtfService::new(store, platform, config)),
                    status: status_tracker,
                    guild_id,
                };

                if let Err(e) = router::seed_statuses(&ctx.http, &data).await {
                    tracing::warn!("Failed to seed scheduled event statuses: {}", e);
                }

                // Catch up on interest changes missed while offline.
                let ctf = Arc::clone(&data.ctf);
                tokio::spawn(async move {
                    match ctf.sync_participants().await {
                        Ok(report) => tracing::info!(
                            synced = report.events_synced,
                            failed = report.events_failed,
                            participants = report.participants_upserted,
                            "Startup participant sync finished"
                        ),
                        Err(e) => tracing::error!("Startup participant sync failed: {}", e),
                    }
                });

                tracing::info!("🚀 Bot is ready!");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
