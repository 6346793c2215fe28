// `/ctf-event` - create a CTF with its role, forum, scheduled event and
// announcement.
//
// Thin layer: collect the options, parse the WIB dates, hand a
// CreateEventRequest to the service and render the result.

use crate::core::ctf::schedule::parse_wib;
use crate::core::ctf::{CreateEventRequest, CtfError, EventDetails};
use crate::discord::ctf::formatter::{
    creation_failure_message, creation_summary, user_message,
};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Create a new CTF event with role, forum channel and scheduled event.
#[allow(clippy::too_many_arguments)]
#[poise::command(slash_command, guild_only, rename = "ctf-event")]
pub async fn ctf_event(
    ctx: Context<'_>,
    #[description = "CTF name (e.g. Pascal CTF 2026)"] name: String,
    #[description = "Start in WIB, DD/MM/YYYY HH:MM"] start_date: String,
    #[description = "End in WIB, DD/MM/YYYY HH:MM"] end_date: String,
    #[description = "Official CTF URL"] url: Option<String>,
    #[description = "Team name"] team_name: Option<String>,
    #[description = "Team password (only shown inside the forum)"] team_password: Option<String>,
    #[description = "Team invite link (only shown inside the forum)"] invite_link: Option<String>,
    #[description = "Channel for the announcement (defaults to the bot channel)"]
    #[channel_types("Text", "News")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let caller_roles: Vec<u64> = ctx
        .author_member()
        .await
        .map(|member| member.roles.iter().map(|r| r.get()).collect())
        .unwrap_or_default();

    // Cheap rejection before parsing anything or deferring.
    if let Err(e) = ctx.data().ctf.authorize(&caller_roles) {
        tracing::info!(user_id = ctx.author().id.get(), "Unauthorized /ctf-event attempt");
        return reply_error(ctx, &e).await;
    }

    ctx.defer_ephemeral().await?;

    let (start_time, end_time) = match (parse_wib(&start_date), parse_wib(&end_date)) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => return reply_error(ctx, &CtfError::from(e)).await,
    };

    let request = CreateEventRequest {
        name,
        start_time,
        end_time,
        details: EventDetails {
            url: non_blank(url),
            team_name: non_blank(team_name),
            team_password: non_blank(team_password),
            invite_link: non_blank(invite_link),
        },
        target_channel_id: channel.map(|c| c.id.get()),
    };

    match ctx.data().ctf.create_event(request, &caller_roles).await {
        Ok(created) => {
            tracing::info!(
                event_id = created.event_id,
                scheduled_event_id = created.external_id,
                slug = %created.slug,
                "CTF event created"
            );
            ctx.send(
                poise::CreateReply::default()
                    .embed(creation_summary(&created))
                    .ephemeral(true),
            )
            .await?;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create CTF event");
            ctx.send(
                poise::CreateReply::default()
                    .content(creation_failure_message(&e))
                    .ephemeral(true),
            )
            .await?;
        }
    }

    Ok(())
}

async fn reply_error(ctx: Context<'_>, err: &CtfError) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(user_message(err))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
