// Serenity implementation of the CtfPlatform trait.
//
// All ids cross the boundary as plain u64; this is the only place that knows
// about serenity builders, permission overwrites and HTTP error codes.

use super::formatter::{render, CTF_COLOUR};
use crate::core::ctf::{
    CtfMessage, CtfPlatform, DiscussionSpaceDraft, InterestedUser, MessageTarget, PlatformError,
    ScheduledEventDraft, ScheduledEventHandle,
};
use ::serenity::http::{HttpError, UserPagination};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{
    self as serenity, ChannelFlags, ChannelId, ChannelType, CreateChannel, CreateForumPost,
    CreateScheduledEvent, EditChannel, EditRole, EditThread, GuildId, PermissionOverwrite,
    PermissionOverwriteType, Permissions, RoleId, ScheduledEventId, ScheduledEventType, UserId,
};
use std::sync::Arc;

/// "Missing Permissions" JSON error code.
const MISSING_PERMISSIONS: isize = 50013;
/// Unknown Channel, Unknown Member, Unknown Role, Unknown Guild Scheduled Event.
const UNKNOWN_RESOURCE_CODES: [isize; 4] = [10003, 10007, 10011, 10070];

// Discord's page size limit for scheduled event subscribers.
const SUBSCRIBER_PAGE: u64 = 100;

pub struct DiscordPlatform {
    http: Arc<serenity::Http>,
    guild_id: GuildId,
}

impl DiscordPlatform {
    pub fn new(http: Arc<serenity::Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }

    async fn send_all(
        &self,
        channel_id: ChannelId,
        messages: Vec<serenity::CreateMessage>,
    ) -> Result<(), PlatformError> {
        for message in messages {
            channel_id
                .send_message(&self.http, message)
                .await
                .map_err(map_error)?;
        }
        Ok(())
    }
}

pub fn event_url(guild_id: u64, scheduled_event_id: u64) -> String {
    format!("https://discord.com/events/{guild_id}/{scheduled_event_id}")
}

fn to_timestamp(at: DateTime<Utc>) -> Result<serenity::Timestamp, PlatformError> {
    serenity::Timestamp::from_unix_timestamp(at.timestamp())
        .map_err(|e| PlatformError::Api(format!("timestamp out of range: {e}")))
}

/// Lock/pin edit for a freshly created forum post, if anything needs changing.
/// Forum posts are pinned through the PINNED channel flag.
fn thread_edit(locked: bool, pinned: bool) -> Option<EditThread<'static>> {
    if !locked && !pinned {
        return None;
    }
    let mut edit = EditThread::new().locked(locked);
    if pinned {
        edit = edit.flags(ChannelFlags::PINNED);
    }
    Some(edit)
}

/// Classify a failed Discord request by HTTP status and JSON error code.
pub fn classify_api_error(status: u16, code: isize, message: &str) -> PlatformError {
    if code == MISSING_PERMISSIONS || status == 403 {
        PlatformError::MissingPermissions(message.to_string())
    } else if status == 404 || UNKNOWN_RESOURCE_CODES.contains(&code) {
        PlatformError::NotFound(message.to_string())
    } else {
        PlatformError::Api(format!("{status} ({code}): {message}"))
    }
}

fn map_error(err: serenity::Error) -> PlatformError {
    match &err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => classify_api_error(
            response.status_code.as_u16(),
            response.error.code,
            &response.error.message,
        ),
        _ => PlatformError::Api(err.to_string()),
    }
}

#[async_trait]
impl CtfPlatform for DiscordPlatform {
    async fn create_role(&self, name: &str, reason: &str) -> Result<u64, PlatformError> {
        let role = self
            .guild_id
            .create_role(
                &self.http,
                EditRole::new()
                    .name(name)
                    .colour(CTF_COLOUR)
                    .mentionable(true)
                    .audit_log_reason(reason),
            )
            .await
            .map_err(map_error)?;

        Ok(role.id.get())
    }

    async fn create_discussion_space(
        &self,
        draft: &DiscussionSpaceDraft,
    ) -> Result<u64, PlatformError> {
        // @everyone shares the guild's id.
        let everyone = RoleId::new(self.guild_id.get());
        let overwrites = vec![
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(everyone),
            },
            PermissionOverwrite {
                allow: Permissions::VIEW_CHANNEL
                    | Permissions::SEND_MESSAGES
                    | Permissions::CREATE_PUBLIC_THREADS
                    | Permissions::SEND_MESSAGES_IN_THREADS
                    | Permissions::READ_MESSAGE_HISTORY,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Role(RoleId::new(draft.visible_to_role)),
            },
        ];

        let mut builder = CreateChannel::new(&draft.name)
            .kind(ChannelType::Forum)
            .permissions(overwrites)
            .audit_log_reason(&draft.reason);
        if let Some(parent_id) = draft.parent_id {
            builder = builder.category(ChannelId::new(parent_id));
        }

        let channel = self
            .guild_id
            .create_channel(&self.http, builder)
            .await
            .map_err(map_error)?;

        Ok(channel.id.get())
    }

    async fn create_scheduled_event(
        &self,
        draft: &ScheduledEventDraft,
    ) -> Result<ScheduledEventHandle, PlatformError> {
        let builder = CreateScheduledEvent::new(
            ScheduledEventType::External,
            &draft.name,
            to_timestamp(draft.start_time)?,
        )
        .end_time(to_timestamp(draft.end_time)?)
        .location(&draft.location)
        .description(&draft.description);

        let event = self
            .guild_id
            .create_scheduled_event(&self.http, builder)
            .await
            .map_err(map_error)?;

        Ok(ScheduledEventHandle {
            id: event.id.get(),
            url: event_url(self.guild_id.get(), event.id.get()),
        })
    }

    async fn grant_role(&self, user_id: u64, role_id: u64) -> Result<(), PlatformError> {
        self.http
            .add_member_role(
                self.guild_id,
                UserId::new(user_id),
                RoleId::new(role_id),
                Some("Joined CTF event"),
            )
            .await
            .map_err(map_error)
    }

    async fn revoke_role(&self, user_id: u64, role_id: u64) -> Result<(), PlatformError> {
        self.http
            .remove_member_role(
                self.guild_id,
                UserId::new(user_id),
                RoleId::new(role_id),
                Some("Left CTF event"),
            )
            .await
            .map_err(map_error)
    }

    async fn delete_role(&self, role_id: u64, reason: &str) -> Result<(), PlatformError> {
        self.http
            .delete_role(self.guild_id, RoleId::new(role_id), Some(reason))
            .await
            .map_err(map_error)
    }

    async fn relocate_space(&self, space_id: u64, parent_id: u64) -> Result<(), PlatformError> {
        ChannelId::new(space_id)
            .edit(
                &self.http,
                EditChannel::new().category(Some(ChannelId::new(parent_id))),
            )
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn post_message(
        &self,
        target: &MessageTarget,
        message: &CtfMessage,
    ) -> Result<(), PlatformError> {
        let mut messages = render(message);

        match target {
            MessageTarget::Channel(channel_id) => {
                self.send_all(ChannelId::new(*channel_id), messages).await
            }
            MessageTarget::NewThread {
                space_id,
                title,
                locked,
                pinned,
            } => {
                if messages.is_empty() {
                    return Ok(());
                }
                let rest = messages.split_off(1);
                let starter = messages.remove(0);

                let thread = ChannelId::new(*space_id)
                    .create_forum_post(&self.http, CreateForumPost::new(title, starter))
                    .await
                    .map_err(map_error)?;

                self.send_all(thread.id, rest).await?;

                if let Some(edit) = thread_edit(*locked, *pinned) {
                    if let Err(e) = thread.id.edit_thread(&self.http, edit).await {
                        tracing::warn!(thread_id = thread.id.get(), error = %e, "Failed to lock/pin thread");
                    }
                }
                Ok(())
            }
        }
    }

    async fn fetch_interested_users(
        &self,
        scheduled_event_id: u64,
    ) -> Result<Vec<InterestedUser>, PlatformError> {
        let event_id = ScheduledEventId::new(scheduled_event_id);
        let mut users = Vec::new();
        let mut after: Option<UserId> = None;

        loop {
            let page = self
                .http
                .get_scheduled_event_users(
                    self.guild_id,
                    event_id,
                    Some(SUBSCRIBER_PAGE),
                    after.map(UserPagination::After),
                    Some(true),
                )
                .await
                .map_err(map_error)?;
            let page_len = page.len();

            for subscriber in page {
                after = Some(subscriber.user.id);
                if subscriber.user.bot {
                    continue;
                }
                let display_name = subscriber
                    .member
                    .as_ref()
                    .and_then(|m| m.nick.clone())
                    .or_else(|| subscriber.user.global_name.clone())
                    .unwrap_or_else(|| subscriber.user.name.clone());
                users.push(InterestedUser {
                    user_id: subscriber.user.id.get(),
                    display_name,
                });
            }

            if (page_len as u64) < SUBSCRIBER_PAGE {
                break;
            }
        }

        Ok(users)
    }
}
