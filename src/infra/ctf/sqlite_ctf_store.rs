// SQLite implementation of the CtfStore trait

use crate::core::ctf::{CtfEvent, CtfStore, NewCtfEvent, Participant, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

pub struct SqliteCtfStore {
    pool: Pool<Sqlite>,
}

impl SqliteCtfStore {
    /// Open (creating if needed) the database at `database_url` and migrate it.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure the file exists if it's a file path
        let path_str = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        if !in_memory && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        // Each connection to :memory: is its own database.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&conn_str)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ctf_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                role_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                archived_at TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL REFERENCES ctf_events(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL,
                display_name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'left')),
                joined_at TEXT NOT NULL,
                left_at TEXT,
                UNIQUE (event_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_event_participants_event
            ON event_participants(event_id, status)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_ctf_events_active
            ON ctf_events(is_active, start_time)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// Fixed-width timestamps so TEXT ordering matches time ordering.
fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

fn parse_optional_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.as_deref().map(parse_time).transpose()
}

fn row_to_event(row: &SqliteRow) -> Result<CtfEvent, StoreError> {
    Ok(CtfEvent {
        id: row.get("id"),
        external_id: row.get::<i64, _>("external_id") as u64,
        name: row.get("name"),
        slug: row.get("slug"),
        role_id: row.get::<i64, _>("role_id") as u64,
        channel_id: row.get::<i64, _>("channel_id") as u64,
        start_time: parse_time(&row.get::<String, _>("start_time"))?,
        end_time: parse_time(&row.get::<String, _>("end_time"))?,
        is_active: row.get("is_active"),
        archived_at: parse_optional_time(row.get("archived_at"))?,
    })
}

fn row_to_participant(row: &SqliteRow) -> Result<Participant, StoreError> {
    let status: String = row.get("status");
    Ok(Participant {
        event_id: row.get("event_id"),
        user_id: row.get::<i64, _>("user_id") as u64,
        display_name: row.get("display_name"),
        status: status.parse().map_err(StoreError::Corrupt)?,
        joined_at: parse_time(&row.get::<String, _>("joined_at"))?,
        left_at: parse_optional_time(row.get("left_at"))?,
    })
}

const EVENT_COLUMNS: &str = "id, external_id, name, slug, role_id, channel_id, start_time, end_time, is_active, archived_at";

#[async_trait]
impl CtfStore for SqliteCtfStore {
    async fn create_event(&self, event: NewCtfEvent) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ctf_events
                (external_id, name, slug, role_id, channel_id, start_time, end_time, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(event.external_id as i64)
        .bind(&event.name)
        .bind(&event.slug)
        .bind(event.role_id as i64)
        .bind(event.channel_id as i64)
        .bind(to_db_time(event.start_time))
        .bind(to_db_time(event.end_time))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn get_event_by_external_id(
        &self,
        external_id: u64,
    ) -> Result<Option<CtfEvent>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM ctf_events WHERE external_id = ?"
        ))
        .bind(external_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.as_ref().map(row_to_event).transpose()
    }

    async fn add_or_reactivate_participant(
        &self,
        event_id: i64,
        user_id: u64,
        display_name: &str,
    ) -> Result<(), StoreError> {
        // A single statement keeps concurrent signals for one user from
        // producing two rows. joined_at only moves when coming back from 'left'.
        sqlx::query(
            r#"
            INSERT INTO event_participants (event_id, user_id, display_name, status, joined_at, left_at)
            VALUES (?, ?, ?, 'active', ?, NULL)
            ON CONFLICT(event_id, user_id) DO UPDATE SET
                display_name = excluded.display_name,
                joined_at = CASE
                    WHEN event_participants.status = 'left' THEN excluded.joined_at
                    ELSE event_participants.joined_at
                END,
                status = 'active',
                left_at = NULL
            "#,
        )
        .bind(event_id)
        .bind(user_id as i64)
        .bind(display_name)
        .bind(to_db_time(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn mark_participant_left(&self, event_id: i64, user_id: u64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE event_participants
            SET status = 'left', left_at = ?
            WHERE event_id = ? AND user_id = ?
            "#,
        )
        .bind(to_db_time(Utc::now()))
        .bind(event_id)
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_participants(
        &self,
        event_id: i64,
        include_left: bool,
    ) -> Result<Vec<Participant>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, user_id, display_name, status, joined_at, left_at
            FROM event_participants
            WHERE event_id = ? AND (? OR status = 'active')
            ORDER BY joined_at ASC, id ASC
            "#,
        )
        .bind(event_id)
        .bind(include_left)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.iter().map(row_to_participant).collect()
    }

    async fn archive_event(&self, event_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE ctf_events
            SET is_active = 0, archived_at = COALESCE(archived_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(to_db_time(Utc::now()))
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_active_events(&self) -> Result<Vec<CtfEvent>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM ctf_events WHERE is_active = 1 ORDER BY start_time ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.iter().map(row_to_event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ctf::ParticipantStatus;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn memory_store() -> SqliteCtfStore {
        SqliteCtfStore::new("sqlite::memory:").await.unwrap()
    }

    fn new_event(external_id: u64, start_in_days: i64) -> NewCtfEvent {
        let start = Utc::now() + Duration::days(start_in_days);
        NewCtfEvent {
            external_id,
            name: format!("CTF {external_id}"),
            slug: format!("ctf-{external_id}"),
            role_id: 1_402_615_202_112_995_418,
            channel_id: 1_458_725_882_410_565_815,
            start_time: start,
            end_time: start + Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_event() {
        let store = memory_store().await;
        let draft = new_event(77, 1);
        let id = store.create_event(draft.clone()).await.unwrap();

        let event = store.get_event_by_external_id(77).await.unwrap().unwrap();
        assert_eq!(event.id, id);
        assert_eq!(event.name, draft.name);
        assert_eq!(event.role_id, draft.role_id);
        assert_eq!(event.channel_id, draft.channel_id);
        assert_eq!(
            event.start_time.timestamp_micros(),
            draft.start_time.timestamp_micros()
        );
        assert!(event.is_active);
        assert_eq!(event.archived_at, None);

        assert!(store.get_event_by_external_id(78).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_external_id_rejected() {
        let store = memory_store().await;
        store.create_event(new_event(1, 1)).await.unwrap();
        assert!(matches!(
            store.create_event(new_event(1, 2)).await,
            Err(StoreError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_rejoin_reactivates_single_row() {
        let store = memory_store().await;
        let event_id = store.create_event(new_event(1, 1)).await.unwrap();

        store
            .add_or_reactivate_participant(event_id, 10, "alice")
            .await
            .unwrap();
        let first = store.list_participants(event_id, true).await.unwrap();
        let first_joined = first[0].joined_at;

        // Repeated join while active keeps the original join time.
        store
            .add_or_reactivate_participant(event_id, 10, "alice")
            .await
            .unwrap();
        let again = store.list_participants(event_id, true).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].joined_at, first_joined);

        store.mark_participant_left(event_id, 10).await.unwrap();
        let left = store.list_participants(event_id, true).await.unwrap();
        assert_eq!(left[0].status, ParticipantStatus::Left);
        assert!(left[0].left_at.is_some());
        assert!(store
            .list_participants(event_id, false)
            .await
            .unwrap()
            .is_empty());

        store
            .add_or_reactivate_participant(event_id, 10, "alice2")
            .await
            .unwrap();
        let back = store.list_participants(event_id, true).await.unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].status, ParticipantStatus::Active);
        assert_eq!(back[0].left_at, None);
        assert_eq!(back[0].display_name, "alice2");
        assert!(back[0].joined_at >= first_joined);
    }

    #[tokio::test]
    async fn test_mark_left_unknown_participant_is_noop() {
        let store = memory_store().await;
        let event_id = store.create_event(new_event(1, 1)).await.unwrap();
        store.mark_participant_left(event_id, 99).await.unwrap();
        assert!(store
            .list_participants(event_id, true)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_participants_ordered_by_join_time() {
        let store = memory_store().await;
        let event_id = store.create_event(new_event(1, 1)).await.unwrap();
        let other_event = store.create_event(new_event(2, 1)).await.unwrap();

        for (user, name) in [(3, "carol"), (1, "alice"), (2, "bob")] {
            store
                .add_or_reactivate_participant(event_id, user, name)
                .await
                .unwrap();
        }
        store
            .add_or_reactivate_participant(other_event, 4, "dave")
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_participants(event_id, true)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.display_name)
            .collect();
        assert_eq!(names, vec!["carol", "alice", "bob"]);
    }

    #[tokio::test]
    async fn test_archive_keeps_first_timestamp() {
        let store = memory_store().await;
        let event_id = store.create_event(new_event(1, 1)).await.unwrap();

        store.archive_event(event_id).await.unwrap();
        let first = store.get_event_by_external_id(1).await.unwrap().unwrap();
        assert!(!first.is_active);
        let archived_at = first.archived_at.unwrap();

        store.archive_event(event_id).await.unwrap();
        let second = store.get_event_by_external_id(1).await.unwrap().unwrap();
        assert_eq!(second.archived_at, Some(archived_at));
    }

    #[tokio::test]
    async fn test_list_active_events_by_start_time() {
        let store = memory_store().await;
        store.create_event(new_event(1, 5)).await.unwrap();
        let archived = store.create_event(new_event(2, 1)).await.unwrap();
        store.create_event(new_event(3, 2)).await.unwrap();
        store.archive_event(archived).await.unwrap();

        let ids: Vec<u64> = store
            .list_active_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.external_id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ctf.db");
        let url = path.to_string_lossy().to_string();

        {
            let store = SqliteCtfStore::new(&url).await.unwrap();
            let event_id = store.create_event(new_event(5, 1)).await.unwrap();
            store
                .add_or_reactivate_participant(event_id, 1, "alice")
                .await
                .unwrap();
        }

        let reopened = SqliteCtfStore::new(&url).await.unwrap();
        let event = reopened.get_event_by_external_id(5).await.unwrap().unwrap();
        let participants = reopened.list_participants(event.id, false).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].display_name, "alice");
    }
}
