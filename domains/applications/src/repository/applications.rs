//! Application repository

use crate::domain::entities::{
    Application, ApplicationFull, Component, ComponentGroup, ComponentGroupFull, Member,
    NewApplication,
};
use sqlx::PgPool;
use statesync_common::{db::map_unique_violation, Error, Result};

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register an application with its initial roster in one transaction.
    ///
    /// Input is already validated ([`NewApplication::new`] enforces the
    /// single-owner invariant); this only has to make it durable atomically.
    pub async fn register(
        &self,
        new_app: &NewApplication,
        server_key_fingerprint: &str,
    ) -> Result<Application> {
        let mut tx = self.pool.begin().await?;

        let application: Application = sqlx::query_as(
            r#"
            INSERT INTO applications (id, name, icon, server_key_fingerprint, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, name, icon, server_key_fingerprint, created_at, updated_at
            "#,
        )
        .bind(&new_app.id)
        .bind(&new_app.name)
        .bind(&new_app.icon)
        .bind(server_key_fingerprint)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::from(map_unique_violation(e)))?;

        for member in &new_app.members {
            sqlx::query(
                r#"
                INSERT INTO members (id, application_id, public_key, name, role, avatar, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                "#,
            )
            .bind(&member.id)
            .bind(&new_app.id)
            .bind(&member.public_key)
            .bind(&member.name)
            .bind(member.role)
            .bind(&member.avatar)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::from(map_unique_violation(e)))?;
        }

        tx.commit().await?;
        Ok(application)
    }

    /// Get an application row. Absence is `None`.
    pub async fn get(&self, id: &str) -> Result<Option<Application>> {
        let application: Option<Application> = sqlx::query_as(
            r#"
            SELECT id, name, icon, server_key_fingerprint, created_at, updated_at
            FROM applications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(application)
    }

    /// Full read: the application with its ordered component tree and its
    /// roster. Groups and components ascend by position, ties broken by id;
    /// the roster is ordered owner-first, then by display name.
    pub async fn get_full(&self, id: &str) -> Result<Option<ApplicationFull>> {
        let Some(application) = self.get(id).await? else {
            return Ok(None);
        };

        let groups: Vec<ComponentGroup> = sqlx::query_as(
            r#"
            SELECT id, application_id, name, position
            FROM component_groups
            WHERE application_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let components: Vec<Component> = sqlx::query_as(
            r#"
            SELECT id, group_id, application_id, name, position, data
            FROM components
            WHERE application_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

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
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let groups = groups
            .into_iter()
            .map(|group| {
                let components = components
                    .iter()
                    .filter(|c| c.group_id == group.id)
                    .cloned()
                    .collect();
                ComponentGroupFull { group, components }
            })
            .collect();

        Ok(Some(ApplicationFull {
            application,
            groups,
            members,
        }))
    }

    /// Applications the given public key is a member of, newest first.
    pub async fn list_for_user(&self, public_key: &str) -> Result<Vec<Application>> {
        let applications: Vec<Application> = sqlx::query_as(
            r#"
            SELECT a.id, a.name, a.icon, a.server_key_fingerprint, a.created_at, a.updated_at
            FROM applications a
            INNER JOIN members m ON a.id = m.application_id
            WHERE m.public_key = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(public_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(applications)
    }

    /// Delete an application. Groups, components, members, and invitations
    /// go with it in one atomic unit (FK cascades); events are left for the
    /// retention sweeper.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump updated_at after a component-tree mutation.
    pub async fn touch(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE applications SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Total applications (status endpoint).
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
