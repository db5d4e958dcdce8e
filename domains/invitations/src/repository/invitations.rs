//! Invitation repository

use sqlx::PgPool;
use uuid::Uuid;

use statesync_applications::MemberRole;
use statesync_common::Result;

use crate::domain::entities::{Invitation, InvitationUse};

#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an invitation with a fresh id.
    pub async fn create(
        &self,
        application_id: &str,
        created_by_public_key: &str,
        granted_role: MemberRole,
        max_uses: Option<i32>,
    ) -> Result<Invitation> {
        let invitation: Invitation = sqlx::query_as(
            r#"
            INSERT INTO invitations
                (id, application_id, created_by_public_key, granted_role,
                 max_uses, used_count, created_at)
            VALUES ($1, $2, $3, $4, $5, 0, NOW())
            RETURNING id, application_id, created_by_public_key, granted_role,
                      max_uses, used_count, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(application_id)
        .bind(created_by_public_key)
        .bind(granted_role)
        .bind(max_uses)
        .fetch_one(&self.pool)
        .await?;

        Ok(invitation)
    }

    /// Get an invitation by id. A revoked invitation is simply absent.
    pub async fn get(&self, id: &str) -> Result<Option<Invitation>> {
        let invitation: Option<Invitation> = sqlx::query_as(
            r#"
            SELECT id, application_id, created_by_public_key, granted_role,
                   max_uses, used_count, created_at
            FROM invitations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    /// Invitations of an application, newest first.
    pub async fn list_by_application(&self, application_id: &str) -> Result<Vec<Invitation>> {
        let invitations: Vec<Invitation> = sqlx::query_as(
            r#"
            SELECT id, application_id, created_by_public_key, granted_role,
                   max_uses, used_count, created_at
            FROM invitations
            WHERE application_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }

    /// Revoke: hard-delete the row. The signed token keeps circulating but
    /// every flow that honors it starts by loading this row.
    pub async fn delete(&self, application_id: &str, id: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM invitations WHERE application_id = $1 AND id = $2")
                .bind(application_id)
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a consumption: bump `used_count` and append an
    /// `invitation_uses` row, atomically. This deliberately runs in its own
    /// transaction, separate from the `member_added` event append.
    pub async fn record_use(&self, invitation_id: &str, user_public_key: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE invitations SET used_count = used_count + 1 WHERE id = $1")
            .bind(invitation_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO invitation_uses (id, invitation_id, user_public_key, used_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(invitation_id)
        .bind(user_public_key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Has this public key consumed this invitation before?
    pub async fn has_used(&self, invitation_id: &str, user_public_key: &str) -> Result<bool> {
        let used: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM invitation_uses
                WHERE invitation_id = $1 AND user_public_key = $2
            )
            "#,
        )
        .bind(invitation_id)
        .bind(user_public_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }

    /// Uses of an invitation, oldest first.
    pub async fn list_uses(&self, invitation_id: &str) -> Result<Vec<InvitationUse>> {
        let uses: Vec<InvitationUse> = sqlx::query_as(
            r#"
            SELECT id, invitation_id, user_public_key, used_at
            FROM invitation_uses
            WHERE invitation_id = $1
            ORDER BY used_at ASC
            "#,
        )
        .bind(invitation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(uses)
    }
}
