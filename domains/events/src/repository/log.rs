//! Append-only event log
//!
//! Sequence assignment happens inside the insert statement
//! (`COALESCE(MAX(sequence_number), 0) + 1` scoped to the application), and
//! an in-process per-application lock serializes appenders so two concurrent
//! accepted events always get distinct, consecutive numbers. There is no
//! ordering across applications.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::Mutex;

use statesync_common::{db::map_unique_violation, Error, Result};

use crate::domain::event::{Event, SubmittedEvent};

/// One page of a cursor read
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub has_more: bool,
    /// Set when the cursor no longer resolves (deleted by retention, or
    /// never existed); the client must drop local state and resync.
    pub full_resync_required: bool,
}

impl EventPage {
    fn resync() -> Self {
        Self {
            events: Vec::new(),
            has_more: false,
            full_resync_required: true,
        }
    }
}

/// Cursor row resolved from a `since` event id
#[derive(sqlx::FromRow)]
struct CursorRow {
    application_id: String,
    sequence_number: i64,
    created_at: i64,
}

#[derive(Clone)]
pub struct EventLogRepository {
    pool: PgPool,
    // Per-application append locks, created on first touch
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl EventLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn append_lock(&self, application_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(application_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append an event, assigning the next sequence number for its
    /// application and stamping the server-side timestamp.
    pub async fn append(
        &self,
        submitted: &SubmittedEvent,
        application_id: &str,
    ) -> Result<Event> {
        let lock = self.append_lock(application_id).await;
        let _guard = lock.lock().await;

        let event: Event = sqlx::query_as(
            r#"
            INSERT INTO events
                (id, application_id, sequence_number, event_type,
                 creator_public_key, version, created_at, data)
            SELECT $1, $2, COALESCE(MAX(sequence_number), 0) + 1, $3, $4, $5, $6, $7
            FROM events
            WHERE application_id = $2
            RETURNING id, application_id, sequence_number, event_type,
                      creator_public_key, version, created_at, data
            "#,
        )
        .bind(&submitted.id)
        .bind(application_id)
        .bind(&submitted.event_type)
        .bind(&submitted.creator_public_key)
        .bind(submitted.version)
        .bind(Utc::now().timestamp())
        .bind(Json(&submitted.data))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::from(map_unique_violation(e)))?;

        Ok(event)
    }

    /// Get a single event by id. Absence is `None`.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Event>> {
        let event: Option<Event> = sqlx::query_as(
            r#"
            SELECT id, application_id, sequence_number, event_type,
                   creator_public_key, version, created_at, data
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Cursor read: events strictly after `since`, scoped to applications
    /// the user is a member of, in `(applicationId, sequenceNumber,
    /// createdAt, id)` order. A cursor that no longer resolves demands a
    /// full resync — the log may have been truncated under it.
    pub async fn list_since(
        &self,
        user_public_key: &str,
        since_event_id: Option<&str>,
        limit: i64,
    ) -> Result<EventPage> {
        let mut events: Vec<Event> = match since_event_id {
            None => {
                sqlx::query_as(
                    r#"
                    SELECT e.id, e.application_id, e.sequence_number, e.event_type,
                           e.creator_public_key, e.version, e.created_at, e.data
                    FROM events e
                    WHERE EXISTS (
                        SELECT 1 FROM members m
                        WHERE m.application_id = e.application_id
                          AND m.public_key = $1
                    )
                    ORDER BY e.application_id ASC, e.sequence_number ASC,
                             e.created_at ASC, e.id ASC
                    LIMIT $2
                    "#,
                )
                .bind(user_public_key)
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await?
            }
            Some(cursor_id) => {
                let cursor: Option<CursorRow> = sqlx::query_as(
                    r#"
                    SELECT application_id, sequence_number, created_at
                    FROM events
                    WHERE id = $1
                    "#,
                )
                .bind(cursor_id)
                .fetch_optional(&self.pool)
                .await?;

                let Some(cursor) = cursor else {
                    return Ok(EventPage::resync());
                };

                sqlx::query_as(
                    r#"
                    SELECT e.id, e.application_id, e.sequence_number, e.event_type,
                           e.creator_public_key, e.version, e.created_at, e.data
                    FROM events e
                    WHERE EXISTS (
                        SELECT 1 FROM members m
                        WHERE m.application_id = e.application_id
                          AND m.public_key = $1
                    )
                    AND (
                        e.application_id <> $2
                        OR e.sequence_number > $3
                        OR (e.sequence_number = $3 AND e.created_at > $4)
                        OR (e.sequence_number = $3 AND e.created_at = $4 AND e.id > $5)
                    )
                    ORDER BY e.application_id ASC, e.sequence_number ASC,
                             e.created_at ASC, e.id ASC
                    LIMIT $6
                    "#,
                )
                .bind(user_public_key)
                .bind(&cursor.application_id)
                .bind(cursor.sequence_number)
                .bind(cursor.created_at)
                .bind(cursor_id)
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let has_more = events.len() as i64 > limit;
        events.truncate(limit as usize);

        Ok(EventPage {
            events,
            has_more,
            full_resync_required: false,
        })
    }

    /// Delete events older than the cutoff (Unix seconds). Returns the
    /// number of rows removed.
    pub async fn delete_older_than(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM events WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Total events (status endpoint).
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
