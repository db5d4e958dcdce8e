//! Component group and component repository
//!
//! These writes are reached exclusively through event projection; the HTTP
//! surface only ever reads the tree via the application full-read.

use crate::domain::entities::{Component, ComponentGroup};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use statesync_common::{db::map_unique_violation, Error, Result};

#[derive(Clone)]
pub struct ComponentRepository {
    pool: PgPool,
}

impl ComponentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_group(
        &self,
        application_id: &str,
        id: &str,
        name: &str,
        position: i32,
    ) -> Result<ComponentGroup> {
        let group: ComponentGroup = sqlx::query_as(
            r#"
            INSERT INTO component_groups (id, application_id, name, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id, application_id, name, position
            "#,
        )
        .bind(id)
        .bind(application_id)
        .bind(name)
        .bind(position)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::from(map_unique_violation(e)))?;

        Ok(group)
    }

    /// Remove a group; its components go with it (FK cascade).
    pub async fn remove_group(&self, application_id: &str, id: &str) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM component_groups WHERE application_id = $1 AND id = $2",
        )
        .bind(application_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Component group not found".to_string()));
        }
        Ok(())
    }

    pub async fn reorder_group(&self, application_id: &str, id: &str, position: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE component_groups SET position = $3 WHERE application_id = $1 AND id = $2",
        )
        .bind(application_id)
        .bind(id)
        .bind(position)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Component group not found".to_string()));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_component(
        &self,
        application_id: &str,
        group_id: &str,
        id: &str,
        name: &str,
        position: i32,
        data: Map<String, Value>,
    ) -> Result<Component> {
        let component: Component = sqlx::query_as(
            r#"
            INSERT INTO components (id, group_id, application_id, name, position, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, group_id, application_id, name, position, data
            "#,
        )
        .bind(id)
        .bind(group_id)
        .bind(application_id)
        .bind(name)
        .bind(position)
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::from(map_unique_violation(e)))?;

        Ok(component)
    }

    pub async fn remove_component(&self, application_id: &str, id: &str) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM components WHERE application_id = $1 AND id = $2")
                .bind(application_id)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Component not found".to_string()));
        }
        Ok(())
    }

    pub async fn reorder_component(
        &self,
        application_id: &str,
        id: &str,
        position: i32,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE components SET position = $3 WHERE application_id = $1 AND id = $2",
        )
        .bind(application_id)
        .bind(id)
        .bind(position)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Component not found".to_string()));
        }
        Ok(())
    }

    pub async fn get_component(
        &self,
        application_id: &str,
        id: &str,
    ) -> Result<Option<Component>> {
        let component: Option<Component> = sqlx::query_as(
            r#"
            SELECT id, group_id, application_id, name, position, data
            FROM components
            WHERE application_id = $1 AND id = $2
            "#,
        )
        .bind(application_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(component)
    }

    /// Merge field values into a component's data map
    /// (projection of `component_data_changed`).
    ///
    /// Read-modify-write inside one transaction with the row locked, so two
    /// concurrent merges on the same component cannot lose fields.
    pub async fn merge_component_data(
        &self,
        application_id: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Component> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Component> = sqlx::query_as(
            r#"
            SELECT id, group_id, application_id, name, position, data
            FROM components
            WHERE application_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(application_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut component =
            current.ok_or_else(|| Error::NotFound("Component not found".to_string()))?;

        for (key, value) in fields {
            component.data.0.insert(key.clone(), value.clone());
        }

        sqlx::query("UPDATE components SET data = $3 WHERE application_id = $1 AND id = $2")
            .bind(application_id)
            .bind(id)
            .bind(Json(&component.data.0))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(component)
    }
}
