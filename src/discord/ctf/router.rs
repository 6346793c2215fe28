// Routes gateway events to the CTF service.
//
// Translation only: pull ids out of serenity types, call the service, log or
// reply with the outcome.

use super::formatter::user_message;
use crate::core::ctf::{
    ButtonJoinOutcome, CtfError, EventStatus, JoinAction, SignalOutcome, StatusChangeOutcome,
};
use crate::discord::{Data, Error};
use poise::serenity_prelude::{
    self as serenity, ComponentInteraction, CreateInteractionResponse,
    CreateInteractionResponseMessage, FullEvent, Interaction, Member, ScheduledEventStatus,
};

const GUILD_ONLY_REPLY: &str = "❌ This button only works inside the server.";

pub fn map_status(status: ScheduledEventStatus) -> EventStatus {
    match status {
        ScheduledEventStatus::Scheduled => EventStatus::Scheduled,
        ScheduledEventStatus::Active => EventStatus::Active,
        ScheduledEventStatus::Completed => EventStatus::Completed,
        ScheduledEventStatus::Canceled => EventStatus::Canceled,
        _ => EventStatus::Unknown,
    }
}

pub async fn handle_event(
    ctx: &serenity::Context,
    event: &FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::GuildScheduledEventUserAdd { subscribed } => {
            if subscribed.guild_id != data.guild_id {
                return Ok(());
            }
            if !data.ctf.is_tracked(subscribed.scheduled_event_id.get()).await? {
                return Ok(());
            }
            let member = data.guild_id.member(ctx, subscribed.user_id).await?;
            if member.user.bot {
                return Ok(());
            }

            let outcome = data
                .ctf
                .on_join(
                    subscribed.scheduled_event_id.get(),
                    subscribed.user_id.get(),
                    member.display_name(),
                )
                .await?;
            if outcome == SignalOutcome::Applied {
                tracing::info!(
                    user_id = subscribed.user_id.get(),
                    scheduled_event_id = subscribed.scheduled_event_id.get(),
                    "{} joined CTF",
                    member.display_name()
                );
            }
        }

        FullEvent::GuildScheduledEventUserRemove { unsubscribed } => {
            if unsubscribed.guild_id != data.guild_id {
                return Ok(());
            }
            data.ctf
                .on_leave(
                    unsubscribed.scheduled_event_id.get(),
                    unsubscribed.user_id.get(),
                )
                .await?;
        }

        FullEvent::GuildScheduledEventCreate { event } => {
            data.status.observe(event.id.get(), map_status(event.status));
        }

        FullEvent::GuildScheduledEventUpdate { event } => {
            if event.guild_id != data.guild_id {
                return Ok(());
            }
            let current = map_status(event.status);
            let previous = data.status.observe(event.id.get(), current);

            match data
                .ctf
                .on_status_change(event.id.get(), previous, current)
                .await?
            {
                StatusChangeOutcome::Completed(report) => tracing::info!(
                    event_id = report.event_id,
                    active = report.active_count,
                    left = report.left_count,
                    revoke_failures = report.revoke_failures,
                    role_deleted = report.role_deleted,
                    "CTF archived"
                ),
                StatusChangeOutcome::UnknownEvent | StatusChangeOutcome::NoTransition => {}
            }
        }

        FullEvent::GuildScheduledEventDelete { event } => {
            data.status.forget(event.id.get());
        }

        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } if JoinAction::is_join_payload(&component.data.custom_id) => {
            handle_join_button(ctx, data, component).await?;
        }

        _ => {}
    }

    Ok(())
}

async fn handle_join_button(
    ctx: &serenity::Context,
    data: &Data,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    let Some(member) = component.member.as_ref() else {
        return reply_ephemeral(ctx, component, GUILD_ONLY_REPLY.to_string()).await;
    };

    let reply = match join_from_button(data, component, member).await {
        Ok(ButtonJoinOutcome::Joined { role_id }) => format!(
            "✅ You've joined the CTF! You now have the <@&{role_id}> role and can see the forum."
        ),
        Ok(ButtonJoinOutcome::AlreadyJoined { role_id }) => {
            format!("ℹ️ You already have the <@&{role_id}> role.")
        }
        Err(e) => {
            tracing::warn!(
                user_id = component.user.id.get(),
                custom_id = %component.data.custom_id,
                error = %e,
                "Join button failed"
            );
            user_message(&e)
        }
    };

    reply_ephemeral(ctx, component, reply).await
}

async fn reply_ephemeral(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    content: String,
) -> Result<(), Error> {
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn join_from_button(
    data: &Data,
    component: &ComponentInteraction,
    member: &Member,
) -> Result<ButtonJoinOutcome, CtfError> {
    let action: JoinAction = component.data.custom_id.parse()?;
    let member_roles: Vec<u64> = member.roles.iter().map(|r| r.get()).collect();

    data.ctf
        .on_button_join(
            action,
            component.user.id.get(),
            member.display_name(),
            &member_roles,
        )
        .await
}

/// Record the current status of every scheduled event so the first update
/// after startup has a previous value to compare against.
pub async fn seed_statuses(http: &serenity::Http, data: &Data) -> Result<(), Error> {
    let events = data.guild_id.scheduled_events(http, false).await?;
    for event in &events {
        data.status.observe(event.id.get(), map_status(event.status));
    }
    tracing::info!("Tracking status of {} scheduled events", events.len());
    Ok(())
}

/// Framework error hook: log, and tell the user something went wrong.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            tracing::error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(command = %ctx.command().qualified_name, "Command failed: {}", error);
            let reply = poise::CreateReply::default()
                .content("❌ An error occurred while executing this command.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::error!("Failed to send error reply: {}", e);
            }
        }
        poise::FrameworkError::UnknownCommand { msg_content, .. } => {
            tracing::warn!("Unknown command: {}", msg_content);
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            tracing::error!(event = event.snake_case_name(), "Event handler failed: {}", error);
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_only_reply_is_distinct() {
        assert!(GUILD_ONLY_REPLY.contains("server"));
        assert_ne!(GUILD_ONLY_REPLY, user_message(&CtfError::EventInactive));
    }

    #[test]
    fn test_map_status() {
        assert_eq!(
            map_status(ScheduledEventStatus::Completed),
            EventStatus::Completed
        );
        assert_eq!(map_status(ScheduledEventStatus::Active), EventStatus::Active);
        assert_eq!(
            map_status(ScheduledEventStatus::Canceled),
            EventStatus::Canceled
        );
        assert_eq!(
            map_status(ScheduledEventStatus::Unknown(9)),
            EventStatus::Unknown
        );
    }
}
