//! Member repository
//!
//! The roster invariant — exactly one owner per application — is enforced
//! here on every write that could violate it, not just at registration.

use crate::domain::entities::{Member, MemberRole};
use sqlx::PgPool;
use statesync_common::{db::map_unique_violation, Error, Result};
use uuid::Uuid;

#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Membership check used by the event pipeline's authorization stage.
    pub async fn is_member(&self, application_id: &str, public_key: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM members
                WHERE application_id = $1 AND public_key = $2
            )
            "#,
        )
        .bind(application_id)
        .bind(public_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Get a member by application and public key. Absence is `None`.
    pub async fn get_by_public_key(
        &self,
        application_id: &str,
        public_key: &str,
    ) -> Result<Option<Member>> {
        let member: Option<Member> = sqlx::query_as(
            r#"
            SELECT id, application_id, public_key, name, role, avatar, created_at
            FROM members
            WHERE application_id = $1 AND public_key = $2
            "#,
        )
        .bind(application_id)
        .bind(public_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Roster size for an application.
    pub async fn count(&self, application_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE application_id = $1")
                .bind(application_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Roster ordered by role rank then display name.
    pub async fn list_by_application(&self, application_id: &str) -> Result<Vec<Member>> {
        let members: Vec<Member> = sqlx::query_as(
            r#"
            SELECT id, application_id, public_key, name, role, avatar, created_at
            FROM members
            WHERE application_id = $1
            ORDER BY
                CASE role
                    WHEN 'owner' THEN 0
                    WHEN 'admin' THEN 1
                    WHEN 'member' THEN 2
                    WHEN 'viewer' THEN 3
                END ASC,
                name ASC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Insert a member with a fresh server-minted id (projection of
    /// `member_added`). Adding a second owner violates the roster invariant.
    pub async fn insert(
        &self,
        application_id: &str,
        public_key: &str,
        name: &str,
        role: MemberRole,
        avatar: Option<&[u8]>,
    ) -> Result<Member> {
        if role.is_owner() && self.owner_exists(application_id, None).await? {
            return Err(Error::Validation(
                "Application already has an owner".to_string(),
            ));
        }

        let member: Member = sqlx::query_as(
            r#"
            INSERT INTO members (id, application_id, public_key, name, role, avatar, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, application_id, public_key, name, role, avatar, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(application_id)
        .bind(public_key)
        .bind(name)
        .bind(role)
        .bind(avatar)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::from(map_unique_violation(e)))?;

        Ok(member)
    }

    /// Delete a member (projection of `member_removed`). The owner row is
    /// immovable: removing it would leave the roster ownerless.
    pub async fn delete(&self, application_id: &str, public_key: &str) -> Result<()> {
        let member = self
            .get_by_public_key(application_id, public_key)
            .await?
            .ok_or_else(|| Error::NotFound("Member not found".to_string()))?;

        if member.role.is_owner() {
            return Err(Error::Validation(
                "The application owner cannot be removed".to_string(),
            ));
        }

        sqlx::query("DELETE FROM members WHERE application_id = $1 AND public_key = $2")
            .bind(application_id)
            .bind(public_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Change a member's role (projection of `member_role_changed`).
    /// Promoting a second member to owner is rejected.
    pub async fn update_role(
        &self,
        application_id: &str,
        public_key: &str,
        new_role: MemberRole,
    ) -> Result<Member> {
        if new_role.is_owner() && self.owner_exists(application_id, Some(public_key)).await? {
            return Err(Error::Validation(
                "Application already has an owner".to_string(),
            ));
        }

        let member: Option<Member> = sqlx::query_as(
            r#"
            UPDATE members SET role = $3
            WHERE application_id = $1 AND public_key = $2
            RETURNING id, application_id, public_key, name, role, avatar, created_at
            "#,
        )
        .bind(application_id)
        .bind(public_key)
        .bind(new_role)
        .fetch_optional(&self.pool)
        .await?;

        member.ok_or_else(|| Error::NotFound("Member not found".to_string()))
    }

    /// Is there an owner other than `except` on this roster?
    async fn owner_exists(&self, application_id: &str, except: Option<&str>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM members
                WHERE application_id = $1 AND role = 'owner'
                  AND ($2::text IS NULL OR public_key <> $2)
            )
            "#,
        )
        .bind(application_id)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
