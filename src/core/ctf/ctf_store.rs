use super::ctf_models::{CtfEvent, NewCtfEvent, Participant};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Durable record of CTF events and their participants.
///
/// Pure CRUD: every method is one query, no retries and no caching. The
/// lifecycle controller is the only writer.
#[async_trait]
pub trait CtfStore: Send + Sync {
    /// Insert a new event and return its internal id.
    async fn create_event(&self, event: NewCtfEvent) -> Result<i64, StoreError>;

    async fn get_event_by_external_id(
        &self,
        external_id: u64,
    ) -> Result<Option<CtfEvent>, StoreError>;

    /// Upsert a participant as active. Must be atomic per (event, user).
    async fn add_or_reactivate_participant(
        &self,
        event_id: i64,
        user_id: u64,
        display_name: &str,
    ) -> Result<(), StoreError>;

    /// Flag a participant as left. Unknown participants are ignored.
    async fn mark_participant_left(&self, event_id: i64, user_id: u64) -> Result<(), StoreError>;

    /// Participants ordered by join time; `include_left` adds the ones who left.
    async fn list_participants(
        &self,
        event_id: i64,
        include_left: bool,
    ) -> Result<Vec<Participant>, StoreError>;

    /// Mark an event inactive and archived. The first archive timestamp is kept.
    async fn archive_event(&self, event_id: i64) -> Result<(), StoreError>;

    async fn list_active_events(&self) -> Result<Vec<CtfEvent>, StoreError>;
}
