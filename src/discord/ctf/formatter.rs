// Turns CTF domain messages into Discord embeds and buttons.

use crate::core::ctf::schedule::{format_range, DATE_FORMAT_HINT};
use crate::core::ctf::{
    AnnouncementStatus, CreatedEvent, CtfError, CtfMessage, EventDetails, PlatformError, Tally,
};
use poise::serenity_prelude::{
    self as serenity, CreateActionRow, CreateAllowedMentions, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateMessage,
};

/// Colour shared by CTF roles and embeds.
pub const CTF_COLOUR: u32 = 0xFF6B6B;

// Discord caps an embed at 25 fields and a message at 6000 characters, so
// tally pages (up to 1024 chars each) go out five per message.
const TALLY_FIELDS_PER_MESSAGE: usize = 5;

const GUIDELINES: &str = "• Share writeups and progress in separate posts per challenge\n\
                          • Don't post flags in public channels\n\
                          • Keep team credentials inside this forum";

/// Render a domain message as one or more Discord messages, in send order.
pub fn render(message: &CtfMessage) -> Vec<CreateMessage> {
    match message {
        CtfMessage::EventInfo {
            name,
            start_time,
            end_time,
            details,
        } => {
            let embed = details_fields(
                CreateEmbed::new()
                    .title(format!("🚩 {name}"))
                    .description(format!(
                        "Welcome to the **{name}** discussion forum! Everything you need is below."
                    ))
                    .colour(CTF_COLOUR)
                    .field("📅 Schedule (WIB)", format_range(*start_time, *end_time), false),
                details,
            )
            .field("📋 Guidelines", GUIDELINES, false)
            .timestamp(serenity::Timestamp::now());

            vec![CreateMessage::new().embed(embed)]
        }

        CtfMessage::Announcement {
            name,
            start_time,
            end_time,
            details,
            event_url,
            space_id,
            role_id,
            join,
        } => {
            let embed = details_fields(
                CreateEmbed::new()
                    .title(format!("🚩 New CTF Event: {name}"))
                    .description("Mark yourself as interested in the event or press the button below to join.")
                    .colour(CTF_COLOUR)
                    .field("📅 Schedule (WIB)", format_range(*start_time, *end_time), false),
                details,
            )
            .field("🗓️ Event", format!("[View scheduled event]({event_url})"), true)
            .field("💬 Forum", format!("<#{space_id}>"), true)
            .field("🎭 Role", format!("<@&{role_id}>"), true)
            .footer(CreateEmbedFooter::new(
                "Team password and invite link are in the forum",
            ));

            let button = CreateButton::new(join.to_string())
                .label("Join CTF")
                .emoji('🚩')
                .style(serenity::ButtonStyle::Success);

            vec![CreateMessage::new()
                .embed(embed)
                .components(vec![CreateActionRow::Buttons(vec![button])])
                .allowed_mentions(CreateAllowedMentions::new())]
        }

        CtfMessage::FinalTally(tally) => {
            let fields = tally_fields(tally);
            fields
                .chunks(TALLY_FIELDS_PER_MESSAGE)
                .enumerate()
                .map(|(index, chunk)| {
                    let mut embed = CreateEmbed::new().colour(CTF_COLOUR);
                    if index == 0 {
                        embed = embed.title(format!("📊 Final Participant List: {}", tally.event_name))
                            .description(tally_summary(tally))
                            .timestamp(serenity::Timestamp::now());
                    }
                    for (name, value) in chunk {
                        embed = embed.field(name, value, false);
                    }
                    CreateMessage::new().embed(embed)
                })
                .collect()
        }
    }
}

fn details_fields(mut embed: CreateEmbed, details: &EventDetails) -> CreateEmbed {
    if let Some(url) = &details.url {
        embed = embed.field("🔗 Official URL", url, false);
    }
    if let Some(team) = &details.team_name {
        embed = embed.field("👥 Team Name", team, true);
    }
    if let Some(password) = &details.team_password {
        embed = embed.field("🔐 Team Password", format!("||{password}||"), true);
    }
    if let Some(invite) = &details.invite_link {
        embed = embed.field("📨 Invite Link", invite, false);
    }
    embed
}

pub fn tally_summary(tally: &Tally) -> String {
    format!(
        "**{}** active participant(s), {} left before the end.",
        tally.active_count(),
        tally.left_count()
    )
}

/// Embed fields for a tally: active pages, then left pages.
pub fn tally_fields(tally: &Tally) -> Vec<(String, String)> {
    let mut fields = Vec::new();

    let active = tally.active_pages();
    if active.is_empty() {
        fields.push((
            "✅ Active Participants".to_string(),
            "No active participants.".to_string(),
        ));
    }
    for (index, page) in active.into_iter().enumerate() {
        let name = if index == 0 {
            format!("✅ Active Participants ({})", tally.active_count())
        } else {
            "✅ Active Participants (cont.)".to_string()
        };
        fields.push((name, page));
    }

    for (index, page) in tally.left_pages().into_iter().enumerate() {
        let name = if index == 0 {
            format!("🚪 Left Before End ({})", tally.left_count())
        } else {
            "🚪 Left Before End (cont.)".to_string()
        };
        fields.push((name, page));
    }

    fields
}

/// Embed shown to the admin after `/ctf-event`.
pub fn creation_summary(created: &CreatedEvent) -> CreateEmbed {
    let announcement = match &created.announcement {
        AnnouncementStatus::Posted { channel_id } => format!("Posted in <#{channel_id}>"),
        AnnouncementStatus::Failed { reason } => format!("⚠️ Not posted: {reason}"),
    };

    CreateEmbed::new()
        .title("✅ CTF Event Created!")
        .colour(CTF_COLOUR)
        .field("🎭 Role", format!("<@&{}>", created.role_id), true)
        .field("💬 Forum", format!("<#{}>", created.channel_id), true)
        .field(
            "🗓️ Event",
            format!("[{}]({})", created.slug, created.event_url),
            true,
        )
        .field("📣 Announcement", announcement, false)
}

/// Short, user-facing text for a failed CTF operation.
pub fn user_message(err: &CtfError) -> String {
    match err {
        CtfError::PermissionDenied => {
            "❌ You don't have permission to create CTF events.".to_string()
        }
        CtfError::InvalidName(name) => {
            format!("❌ \"{name}\" can't be turned into a channel name. Use letters or digits.")
        }
        CtfError::InvalidSchedule(e) => {
            format!("❌ {e}. Use {DATE_FORMAT_HINT}, in WIB (UTC+7).")
        }
        CtfError::EndBeforeStart => "❌ End date must be after start date.".to_string(),
        CtfError::StartInPast => "❌ Start date cannot be in the past.".to_string(),
        CtfError::MalformedAction(_) => "❌ This button is not valid anymore.".to_string(),
        CtfError::EventInactive => "❌ This CTF event is no longer active.".to_string(),
        CtfError::RoleMismatch => "❌ This button does not belong to this CTF.".to_string(),
        CtfError::Platform(PlatformError::MissingPermissions(_)) => {
            "❌ Bot is missing permissions. Please ensure the bot has Manage Roles, Manage Channels, and Manage Events permissions.".to_string()
        }
        CtfError::Platform(_) | CtfError::Store(_) => {
            "❌ Something went wrong talking to Discord or the database. Please try again.".to_string()
        }
    }
}

/// Reply for a failed `/ctf-event`. Discord and database failures carry the
/// underlying error, since earlier steps may already have created resources.
pub fn creation_failure_message(err: &CtfError) -> String {
    match err {
        CtfError::Platform(PlatformError::Api(_) | PlatformError::NotFound(_))
        | CtfError::Store(_) => {
            format!("❌ Failed to create CTF event.\n\n**Error:** {err}")
        }
        other => user_message(other),
    }
}
