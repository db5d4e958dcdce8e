//! User repository

use crate::domain::entities::{NewUser, User};
use sqlx::PgPool;
use statesync_auth::UserRole;
use statesync_common::{db::map_unique_violation, Error, Result};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user. Duplicate public key or username is a conflict.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (public_key, username, role, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING public_key, username, role, created_at
            "#,
        )
        .bind(&new_user.public_key)
        .bind(&new_user.username)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::from(map_unique_violation(e)))?;

        Ok(user)
    }

    /// Get user by public key. Absence is `None`, not an error.
    pub async fn get_by_public_key(&self, public_key: &str) -> Result<Option<User>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT public_key, username, role, created_at
            FROM users
            WHERE public_key = $1
            "#,
        )
        .bind(public_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by username. Absence is `None`, not an error.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT public_key, username, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update a user's server-wide role.
    pub async fn update_role(&self, public_key: &str, role: UserRole) -> Result<Option<User>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            UPDATE users SET role = $2
            WHERE public_key = $1
            RETURNING public_key, username, role, created_at
            "#,
        )
        .bind(public_key)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Total registered users (status endpoint).
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
