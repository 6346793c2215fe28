// The slice of the chat platform the CTF lifecycle needs.
//
// The controller only talks to Discord through this trait, so it can be
// driven by a fake in tests. Messages are described as domain values; the
// adapter decides how they look.

use super::ctf_models::EventDetails;
use super::join_action::JoinAction;
use super::tally::Tally;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The role, channel, member or event no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The bot lacks a permission for the call.
    #[error("Missing permissions: {0}")]
    MissingPermissions(String),
    #[error("Platform API error: {0}")]
    Api(String),
}

/// Forum-style channel visible only to one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionSpaceDraft {
    pub name: String,
    pub parent_id: Option<u64>,
    /// The only role granted visibility; everyone else is denied.
    pub visible_to_role: u64,
    pub reason: String,
}

/// Platform-native scheduled event (external location).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEventDraft {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    /// Public text; must not carry secrets.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEventHandle {
    pub id: u64,
    pub url: String,
}

/// A user who marked a scheduled event as "interested".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestedUser {
    pub user_id: u64,
    pub display_name: String,
}

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    Channel(u64),
    /// Open a new thread (forum post) in a discussion space.
    NewThread {
        space_id: u64,
        title: String,
        locked: bool,
        pinned: bool,
    },
}

/// Messages the lifecycle posts.
#[derive(Debug, Clone, PartialEq)]
pub enum CtfMessage {
    /// Info post for role holders; includes the team password.
    EventInfo {
        name: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        details: EventDetails,
    },
    /// Public announcement with a join button; secrets already stripped.
    Announcement {
        name: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        details: EventDetails,
        event_url: String,
        space_id: u64,
        role_id: u64,
        join: JoinAction,
    },
    FinalTally(Tally),
}

#[async_trait]
pub trait CtfPlatform: Send + Sync {
    /// Create a mentionable role; returns its id.
    async fn create_role(&self, name: &str, reason: &str) -> Result<u64, PlatformError>;

    /// Create a role-gated discussion space; returns its id.
    async fn create_discussion_space(
        &self,
        draft: &DiscussionSpaceDraft,
    ) -> Result<u64, PlatformError>;

    async fn create_scheduled_event(
        &self,
        draft: &ScheduledEventDraft,
    ) -> Result<ScheduledEventHandle, PlatformError>;

    async fn grant_role(&self, user_id: u64, role_id: u64) -> Result<(), PlatformError>;

    async fn revoke_role(&self, user_id: u64, role_id: u64) -> Result<(), PlatformError>;

    async fn delete_role(&self, role_id: u64, reason: &str) -> Result<(), PlatformError>;

    /// Move a discussion space under another parent container.
    async fn relocate_space(&self, space_id: u64, parent_id: u64) -> Result<(), PlatformError>;

    async fn post_message(
        &self,
        target: &MessageTarget,
        message: &CtfMessage,
    ) -> Result<(), PlatformError>;

    async fn fetch_interested_users(
        &self,
        scheduled_event_id: u64,
    ) -> Result<Vec<InterestedUser>, PlatformError>;
}
