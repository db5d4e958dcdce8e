//! Setup configuration repository
//!
//! Single-row bookkeeping for one-time server setup facts, currently just
//! the moment the first owner was registered.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use statesync_common::Result;

#[derive(Clone)]
pub struct SetupRepository {
    pool: PgPool,
}

impl SetupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record the first successful owner bootstrap. Later bootstraps keep
    /// the original timestamp.
    pub async fn mark_owner_registered(&self) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO setup_config (key, value, updated_at)
            VALUES ('owner_registered_at', to_jsonb(NOW()), NOW())
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// When the first owner was registered, if ever.
    pub async fn owner_registered_at(&self) -> Result<Option<DateTime<Utc>>> {
        let value: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT value FROM setup_config WHERE key = 'owner_registered_at'",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(value
            .and_then(|v| v.as_str().map(str::to_owned))
            .and_then(|s| s.parse().ok()))
    }
}
