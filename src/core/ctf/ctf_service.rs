// CTF lifecycle service - creation, membership tracking and teardown.
//
// Flow of an event:
// - create: role -> forum -> scheduled event -> DB row -> info thread -> announcement
// - live:   "interested" toggles and the join button grant/revoke the role
// - done:   tally thread -> forum archived -> roles revoked -> role deleted -> row archived
//
// Discord is reached only through `CtfPlatform`, storage only through
// `CtfStore`. Nothing is rolled back when a creation step fails midway.

use super::ctf_config::CtfConfig;
use super::ctf_models::{
    AnnouncementStatus, ButtonJoinOutcome, CompletionReport, CreateEventRequest, CreatedEvent,
    CtfEvent, EventStatus, NewCtfEvent, ParticipantStatus, SignalOutcome, StatusChangeOutcome,
    SyncReport,
};
use super::ctf_platform::{
    CtfMessage, CtfPlatform, DiscussionSpaceDraft, MessageTarget, PlatformError,
    ScheduledEventDraft,
};
use super::ctf_store::{CtfStore, StoreError};
use super::join_action::{JoinAction, JoinActionError};
use super::schedule::ScheduleError;
use super::slug::slugify;
use super::tally::Tally;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const INFO_THREAD_TITLE: &str = "📌 Event Information & Guidelines";
pub const TALLY_THREAD_TITLE: &str = "📊 Final Participant List";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CtfError {
    #[error("You do not have permission to manage CTF events")]
    PermissionDenied,

    #[error("Invalid event name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    InvalidSchedule(#[from] ScheduleError),

    #[error("End date must be after start date")]
    EndBeforeStart,

    #[error("Start date is in the past")]
    StartInPast,

    #[error(transparent)]
    MalformedAction(#[from] JoinActionError),

    #[error("This CTF event is no longer active")]
    EventInactive,

    #[error("Join button does not match the event's role")]
    RoleMismatch,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reject schedules that end before they start or start in the past.
pub fn validate_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), CtfError> {
    if end <= start {
        return Err(CtfError::EndBeforeStart);
    }
    if start < now {
        return Err(CtfError::StartInPast);
    }
    Ok(())
}

/// Only a change *into* `Completed` triggers cleanup. An unknown previous
/// status counts as not completed.
pub fn is_completion_transition(previous: Option<EventStatus>, current: EventStatus) -> bool {
    current == EventStatus::Completed && previous != Some(EventStatus::Completed)
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct CtfService<S: CtfStore, P: CtfPlatform> {
    store: S,
    platform: P,
    config: CtfConfig,
}

impl<S: CtfStore, P: CtfPlatform> CtfService<S, P> {
    pub fn new(store: S, platform: P, config: CtfConfig) -> Self {
        Self {
            store,
            platform,
            config,
        }
    }

    /// Check the caller against the admin allow-list.
    pub fn authorize(&self, caller_role_ids: &[u64]) -> Result<(), CtfError> {
        if self.config.is_admin(caller_role_ids) {
            Ok(())
        } else {
            Err(CtfError::PermissionDenied)
        }
    }

    /// Create the role, forum, scheduled event, DB row, info thread and
    /// announcement for a new CTF.
    ///
    /// Validation and permission failures happen before any side effect. A
    /// platform or storage failure later on leaves whatever was already
    /// created in place. A failed announcement does not fail the call; it is
    /// reported in [`CreatedEvent::announcement`].
    pub async fn create_event(
        &self,
        request: CreateEventRequest,
        caller_role_ids: &[u64],
    ) -> Result<CreatedEvent, CtfError> {
        self.authorize(caller_role_ids)?;
        validate_schedule(request.start_time, request.end_time, Utc::now())?;

        let name = request.name.trim().to_string();
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(CtfError::InvalidName(request.name.clone()));
        }
        let reason = format!("CTF Event: {name}");

        let role_id = self.platform.create_role(&slug, &reason).await?;
        tracing::info!(role_id, slug = %slug, "Created CTF role");

        let space_id = self
            .platform
            .create_discussion_space(&DiscussionSpaceDraft {
                name: slug.clone(),
                parent_id: self.config.active_category_id,
                visible_to_role: role_id,
                reason: reason.clone(),
            })
            .await?;
        tracing::info!(channel_id = space_id, slug = %slug, "Created CTF forum");

        let scheduled = self
            .platform
            .create_scheduled_event(&ScheduledEventDraft {
                name: name.clone(),
                start_time: request.start_time,
                end_time: request.end_time,
                location: request.details.location().to_string(),
                description: request.details.public_description(),
            })
            .await?;
        tracing::info!(scheduled_event_id = scheduled.id, "Created scheduled event");

        let event_id = self
            .store
            .create_event(NewCtfEvent {
                external_id: scheduled.id,
                name: name.clone(),
                slug: slug.clone(),
                role_id,
                channel_id: space_id,
                start_time: request.start_time,
                end_time: request.end_time,
            })
            .await?;
        tracing::info!(event_id, "Saved CTF event");

        self.platform
            .post_message(
                &MessageTarget::NewThread {
                    space_id,
                    title: INFO_THREAD_TITLE.to_string(),
                    locked: true,
                    pinned: true,
                },
                &CtfMessage::EventInfo {
                    name: name.clone(),
                    start_time: request.start_time,
                    end_time: request.end_time,
                    details: request.details.clone(),
                },
            )
            .await?;

        let announcement_message = CtfMessage::Announcement {
            name,
            start_time: request.start_time,
            end_time: request.end_time,
            details: request.details.without_secrets(),
            event_url: scheduled.url.clone(),
            space_id,
            role_id,
            join: JoinAction::new(scheduled.id, role_id),
        };
        let announcement = self
            .announce(request.target_channel_id, &announcement_message)
            .await;

        Ok(CreatedEvent {
            event_id,
            external_id: scheduled.id,
            event_url: scheduled.url,
            slug,
            role_id,
            channel_id: space_id,
            announcement,
        })
    }

    async fn announce(&self, target: Option<u64>, message: &CtfMessage) -> AnnouncementStatus {
        let Some(channel_id) = target.or(self.config.announcement_channel_id) else {
            tracing::warn!("No announcement channel given or configured");
            return AnnouncementStatus::Failed {
                reason: "no announcement channel given or configured".to_string(),
            };
        };

        match self
            .platform
            .post_message(&MessageTarget::Channel(channel_id), message)
            .await
        {
            Ok(()) => AnnouncementStatus::Posted { channel_id },
            Err(e) => {
                tracing::warn!(channel_id, error = %e, "Failed to post CTF announcement");
                AnnouncementStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Upsert everyone currently "interested" in each active event.
    ///
    /// Run once at startup to catch signals missed while offline. Users who
    /// dropped interest in the meantime are not detected here. A failing event
    /// is logged and skipped.
    pub async fn sync_participants(&self) -> Result<SyncReport, CtfError> {
        let events = self.store.list_active_events().await?;
        tracing::info!("Syncing participants for {} active CTF events", events.len());

        let mut report = SyncReport::default();
        for event in events {
            match self.sync_event(&event).await {
                Ok(count) => {
                    tracing::info!(event_id = event.id, "Synced {} participants for {}", count, event.name);
                    report.events_synced += 1;
                    report.participants_upserted += count;
                }
                Err(e) => {
                    tracing::error!(event_id = event.id, error = %e, "Failed to sync CTF event {}", event.name);
                    report.events_failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn sync_event(&self, event: &CtfEvent) -> Result<usize, CtfError> {
        let users = self
            .platform
            .fetch_interested_users(event.external_id)
            .await?;

        for user in &users {
            self.store
                .add_or_reactivate_participant(event.id, user.user_id, &user.display_name)
                .await?;
        }

        Ok(users.len())
    }

    /// Whether a scheduled event belongs to a CTF that still reacts to signals.
    pub async fn is_tracked(&self, external_id: u64) -> Result<bool, CtfError> {
        Ok(self
            .store
            .get_event_by_external_id(external_id)
            .await?
            .is_some_and(|event| event.is_active))
    }

    /// A user marked the scheduled event as interested.
    ///
    /// The role is granted first; if that fails nothing is recorded.
    pub async fn on_join(
        &self,
        external_id: u64,
        user_id: u64,
        display_name: &str,
    ) -> Result<SignalOutcome, CtfError> {
        let Some(event) = self.store.get_event_by_external_id(external_id).await? else {
            tracing::debug!(scheduled_event_id = external_id, "Join for unknown event");
            return Ok(SignalOutcome::Ignored);
        };
        if !event.is_active {
            tracing::debug!(event_id = event.id, "Join for archived event ignored");
            return Ok(SignalOutcome::Ignored);
        }

        self.platform.grant_role(user_id, event.role_id).await?;
        tracing::info!(user_id, role_id = event.role_id, "Assigned role {}", event.slug);

        self.store
            .add_or_reactivate_participant(event.id, user_id, display_name)
            .await?;
        tracing::info!(user_id, event_id = event.id, "Added {} to participants", display_name);

        Ok(SignalOutcome::Applied)
    }

    /// A user removed their interest. The row is kept with status `left`.
    pub async fn on_leave(&self, external_id: u64, user_id: u64) -> Result<SignalOutcome, CtfError> {
        let Some(event) = self.store.get_event_by_external_id(external_id).await? else {
            tracing::debug!(scheduled_event_id = external_id, "Leave for unknown event");
            return Ok(SignalOutcome::Ignored);
        };
        if !event.is_active {
            tracing::debug!(event_id = event.id, "Leave for archived event ignored");
            return Ok(SignalOutcome::Ignored);
        }

        match self.platform.revoke_role(user_id, event.role_id).await {
            Ok(()) => {
                tracing::info!(user_id, role_id = event.role_id, "Removed role {}", event.slug)
            }
            // Member already gone from the guild: still record the leave.
            Err(PlatformError::NotFound(what)) => {
                tracing::warn!(user_id, role_id = event.role_id, "Role revoke skipped, {} not found", what)
            }
            Err(e) => return Err(e.into()),
        }

        self.store.mark_participant_left(event.id, user_id).await?;
        tracing::info!(user_id, event_id = event.id, "Marked participant as left");

        Ok(SignalOutcome::Applied)
    }

    /// The "Join CTF" button on an announcement.
    ///
    /// `member_role_ids` are the roles the clicking member currently holds.
    pub async fn on_button_join(
        &self,
        action: JoinAction,
        user_id: u64,
        display_name: &str,
        member_role_ids: &[u64],
    ) -> Result<ButtonJoinOutcome, CtfError> {
        let event = match self.store.get_event_by_external_id(action.event_id).await? {
            Some(event) if event.is_active => event,
            _ => return Err(CtfError::EventInactive),
        };

        if event.role_id != action.role_id {
            tracing::warn!(
                event_id = event.id,
                button_role_id = action.role_id,
                role_id = event.role_id,
                "Join button role does not match event"
            );
            return Err(CtfError::RoleMismatch);
        }

        if member_role_ids.contains(&event.role_id) {
            return Ok(ButtonJoinOutcome::AlreadyJoined {
                role_id: event.role_id,
            });
        }

        self.platform.grant_role(user_id, event.role_id).await?;
        self.store
            .add_or_reactivate_participant(event.id, user_id, display_name)
            .await?;
        tracing::info!(user_id, event_id = event.id, "Joined CTF via button");

        Ok(ButtonJoinOutcome::Joined {
            role_id: event.role_id,
        })
    }

    /// A scheduled event changed status. Cleanup runs only on the transition
    /// into `Completed`.
    pub async fn on_status_change(
        &self,
        external_id: u64,
        previous: Option<EventStatus>,
        current: EventStatus,
    ) -> Result<StatusChangeOutcome, CtfError> {
        if !is_completion_transition(previous, current) {
            return Ok(StatusChangeOutcome::NoTransition);
        }
        tracing::info!(scheduled_event_id = external_id, "Scheduled event completed");
        self.on_completion(external_id).await
    }

    /// Post the final tally, archive the forum, strip and delete the role and
    /// archive the row.
    ///
    /// Not idempotent: a replay posts another tally. Role revocation and role
    /// deletion are best-effort, so a replay after the role is gone still ends
    /// with the event archived.
    pub async fn on_completion(&self, external_id: u64) -> Result<StatusChangeOutcome, CtfError> {
        let Some(event) = self.store.get_event_by_external_id(external_id).await? else {
            tracing::info!(scheduled_event_id = external_id, "Completed event not tracked");
            return Ok(StatusChangeOutcome::UnknownEvent);
        };

        let participants = self.store.list_participants(event.id, true).await?;
        let tally = Tally::new(&event.name, &participants, self.config.tally_page_size);
        tracing::info!(
            event_id = event.id,
            active = tally.active_count(),
            left = tally.left_count(),
            "Found participants for completed CTF"
        );

        let (tally_posted, space_relocated) = self.archive_space(&event, &tally).await?;

        let mut revoke_failures = 0;
        for participant in participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Active)
        {
            if let Err(e) = self
                .platform
                .revoke_role(participant.user_id, event.role_id)
                .await
            {
                tracing::error!(
                    user_id = participant.user_id,
                    error = %e,
                    "Failed to remove role from {}",
                    participant.display_name
                );
                revoke_failures += 1;
            }
        }

        let role_deleted = match self
            .platform
            .delete_role(event.role_id, &format!("CTF Event completed: {}", event.name))
            .await
        {
            Ok(()) => {
                tracing::info!(role_id = event.role_id, "Deleted role {}", event.slug);
                true
            }
            Err(e) => {
                tracing::error!(role_id = event.role_id, error = %e, "Failed to delete role");
                false
            }
        };

        self.store.archive_event(event.id).await?;
        tracing::info!(event_id = event.id, "Cleanup completed for {}", event.name);

        Ok(StatusChangeOutcome::Completed(CompletionReport {
            event_id: event.id,
            active_count: tally.active_count(),
            left_count: tally.left_count(),
            tally_posted,
            space_relocated,
            revoke_failures,
            role_deleted,
        }))
    }

    /// Post the tally thread and move the forum to the archive category.
    /// A forum that no longer exists is skipped; other errors propagate.
    async fn archive_space(&self, event: &CtfEvent, tally: &Tally) -> Result<(bool, bool), CtfError> {
        let target = MessageTarget::NewThread {
            space_id: event.channel_id,
            title: TALLY_THREAD_TITLE.to_string(),
            locked: false,
            pinned: false,
        };

        match self
            .platform
            .post_message(&target, &CtfMessage::FinalTally(tally.clone()))
            .await
        {
            Ok(()) => tracing::info!(channel_id = event.channel_id, "Posted participant list to forum"),
            Err(PlatformError::NotFound(_)) => {
                tracing::warn!(channel_id = event.channel_id, "Forum is gone, skipping tally and archive move");
                return Ok((false, false));
            }
            Err(e) => return Err(e.into()),
        }

        let Some(archive_id) = self.config.archive_category_id else {
            tracing::warn!("ARCHIVE_CATEGORY_ID not configured, forum left in place");
            return Ok((true, false));
        };

        self.platform
            .relocate_space(event.channel_id, archive_id)
            .await?;
        tracing::info!(channel_id = event.channel_id, archive_id, "Moved forum to archive category");

        Ok((true, true))
    }
}

// ============================================================================
// TESTS
// ============================================================================
