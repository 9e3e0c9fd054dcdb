//! Create payloads and the container patch, with the SQL that applies it.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::CodeboxError;

/// Abstraction for applying a patch payload to the database.
#[async_trait]
pub trait DbPatchable {
    async fn apply_patch(&self, pool: &SqlitePool) -> Result<(), CodeboxError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerCreate {
    pub container_id: String,
    pub container_name: String,
    pub user_id: i64,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerPatch {
    /// Row id (not the engine id).
    pub id: i64,
    /// `None` => do not change; `Some(v)` => update
    pub status: Option<String>,
}

#[async_trait]
impl DbPatchable for ContainerPatch {
    async fn apply_patch(&self, pool: &SqlitePool) -> Result<(), CodeboxError> {
        let status_set = self.status.is_some();
        let updated_at = Utc::now();

        let res = sqlx::query(
            r#"
            UPDATE containers
            SET
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(self.status.as_deref())
        .bind(updated_at)
        .bind(self.id)
        .execute(pool)
        .await?;

        let affected = res.rows_affected();
        debug!(
            id = self.id,
            affected,
            updated_at = %updated_at,
            status_set,
            "container patch applied"
        );

        if affected == 0 {
            return Err(CodeboxError::ContainerNotFound);
        }
        Ok(())
    }
}
