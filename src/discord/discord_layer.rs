// Discord layer - commands, event routing and the CtfPlatform adapter.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "ctf/mod.rs"]
pub mod ctf;

use crate::core::ctf::{CtfService, StatusTracker};
use crate::infra::ctf::SqliteCtfStore;
use ctf::DiscordPlatform;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Shared state handed to every command and event.
pub struct Data {
    pub ctf: Arc<CtfService<SqliteCtfStore, DiscordPlatform>>,
    pub status: Arc<StatusTracker>,
    /// The one guild this bot manages.
    pub guild_id: serenity::GuildId,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
