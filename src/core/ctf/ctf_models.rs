// CTF domain models - events, participants and the data passed between the
// lifecycle controller, the store and the platform adapter.
//
// Pure domain types. Ids are plain u64 so nothing here depends on serenity.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Placeholder location for scheduled events created without a URL.
pub const DEFAULT_EVENT_LOCATION: &str = "CTF Platform";

/// A tracked CTF, as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CtfEvent {
    /// Internal row id.
    pub id: i64,
    /// Discord scheduled event id.
    pub external_id: u64,
    pub name: String,
    pub slug: String,
    pub role_id: u64,
    /// Forum channel holding the event's discussion.
    pub channel_id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Everything needed to insert a new event row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCtfEvent {
    pub external_id: u64,
    pub name: String,
    pub slug: String,
    pub role_id: u64,
    pub channel_id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantStatus {
    Active,
    Left,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Active => "active",
            ParticipantStatus::Left => "left",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ParticipantStatus::Active),
            "left" => Ok(ParticipantStatus::Left),
            other => Err(format!("unknown participant status: {other}")),
        }
    }
}

/// One user's membership in one event. Unique per (event, user).
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub event_id: i64,
    pub user_id: u64,
    /// Name snapshot taken at the latest (re)join.
    pub display_name: String,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

/// Status of a Discord scheduled event, without the serenity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Scheduled,
    Active,
    Completed,
    Canceled,
    Unknown,
}

/// Team/URL metadata an admin can attach to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDetails {
    pub url: Option<String>,
    pub team_name: Option<String>,
    /// Only ever shown inside the role-gated forum.
    pub team_password: Option<String>,
    pub invite_link: Option<String>,
}

impl EventDetails {
    /// Description for the public scheduled event. Never includes the password
    /// or the invite link.
    pub fn public_description(&self) -> String {
        let mut description = String::new();

        if let Some(url) = &self.url {
            description.push_str(&format!("🔗 Official URL: {url}\n\n"));
        }

        if self.team_name.is_some() || self.invite_link.is_some() {
            description.push_str("**Team Information:**\n");
            if let Some(team) = &self.team_name {
                description.push_str(&format!("👥 Team Name: {team}\n"));
            }
            description.push_str("\n🔐 Team Password & Invite Link are available in the forum channel");
        }

        if description.is_empty() {
            "CTF Competition Event".to_string()
        } else {
            description
        }
    }

    /// Copy safe to post in public channels.
    pub fn without_secrets(&self) -> Self {
        Self {
            url: self.url.clone(),
            team_name: self.team_name.clone(),
            team_password: None,
            invite_link: None,
        }
    }

    pub fn location(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_EVENT_LOCATION)
    }
}

/// Input of the create-event operation, with dates already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEventRequest {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub details: EventDetails,
    /// Announcement channel override; falls back to the configured default.
    pub target_channel_id: Option<u64>,
}

/// Whether the announcement step of event creation went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementStatus {
    Posted { channel_id: u64 },
    /// Everything else was created; only the announcement is missing.
    Failed { reason: String },
}

/// What the admin gets back after creating an event.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub event_id: i64,
    pub external_id: u64,
    pub event_url: String,
    pub slug: String,
    pub role_id: u64,
    pub channel_id: u64,
    pub announcement: AnnouncementStatus,
}

/// Result of a live interest signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Applied,
    /// Event unknown (or inactive for joins); nothing was changed.
    Ignored,
}

/// Result of the join button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonJoinOutcome {
    Joined { role_id: u64 },
    AlreadyJoined { role_id: u64 },
}

/// Summary of a startup participant sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub events_synced: usize,
    pub events_failed: usize,
    pub participants_upserted: usize,
}

/// Summary of the cleanup run when an event completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub event_id: i64,
    pub active_count: usize,
    pub left_count: usize,
    pub tally_posted: bool,
    pub space_relocated: bool,
    pub revoke_failures: usize,
    pub role_deleted: bool,
}

/// Result of a status-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChangeOutcome {
    /// Not a transition into `Completed`.
    NoTransition,
    /// Completed, but the scheduled event is not one of ours.
    UnknownEvent,
    Completed(CompletionReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_details() -> EventDetails {
        EventDetails {
            url: Some("https://ctf.example".to_string()),
            team_name: Some("byte-bandits".to_string()),
            team_password: Some("hunter2".to_string()),
            invite_link: Some("https://ctf.example/invite/abc".to_string()),
        }
    }

    #[test]
    fn test_public_description_excludes_secrets() {
        let description = full_details().public_description();
        assert!(description.contains("https://ctf.example"));
        assert!(description.contains("byte-bandits"));
        assert!(!description.contains("hunter2"));
        assert!(!description.contains("/invite/abc"));
    }

    #[test]
    fn test_public_description_fallback() {
        assert_eq!(
            EventDetails::default().public_description(),
            "CTF Competition Event"
        );
    }

    #[test]
    fn test_without_secrets_drops_password_and_invite() {
        let public = full_details().without_secrets();
        assert_eq!(public.team_password, None);
        assert_eq!(public.invite_link, None);
        assert_eq!(public.team_name.as_deref(), Some("byte-bandits"));
    }

    #[test]
    fn test_location_placeholder() {
        assert_eq!(EventDetails::default().location(), DEFAULT_EVENT_LOCATION);
        assert_eq!(full_details().location(), "https://ctf.example");
    }

    #[test]
    fn test_participant_status_round_trips_through_text() {
        for status in [ParticipantStatus::Active, ParticipantStatus::Left] {
            assert_eq!(status.as_str().parse::<ParticipantStatus>(), Ok(status));
        }
        assert!("banned".parse::<ParticipantStatus>().is_err());
    }
}
