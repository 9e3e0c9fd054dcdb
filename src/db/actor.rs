use crate::db::models::{DbContainer, DbUser};
use crate::db::patch::{ContainerCreate, ContainerPatch, DbPatchable, UserCreate};
use crate::db::schema::SQLITE_INIT;
use crate::error::CodeboxError;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert a user and return its id.
    CreateUser(UserCreate, RpcReplyPort<Result<i64, CodeboxError>>),

    /// Look a user up by (normalized) email.
    GetUserByEmail(String, RpcReplyPort<Result<Option<DbUser>, CodeboxError>>),

    GetUserById(i64, RpcReplyPort<Result<Option<DbUser>, CodeboxError>>),

    /// Insert a container row and return it.
    CreateContainer(ContainerCreate, RpcReplyPort<Result<DbContainer, CodeboxError>>),

    /// All containers owned by a user, oldest first.
    ListUserContainers(i64, RpcReplyPort<Result<Vec<DbContainer>, CodeboxError>>),

    /// Container by engine id, only if owned by the given user.
    GetUserContainer(
        String,
        i64,
        RpcReplyPort<Result<Option<DbContainer>, CodeboxError>>,
    ),

    PatchContainer(ContainerPatch, RpcReplyPort<Result<(), CodeboxError>>),

    /// Delete a container row by row id.
    DeleteContainer(i64, RpcReplyPort<Result<(), CodeboxError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn create_user(&self, create: UserCreate) -> Result<i64, CodeboxError> {
        ractor::call!(self.actor, DbActorMessage::CreateUser, create)
            .map_err(|e| CodeboxError::RactorError(format!("DbActor CreateUser RPC failed: {e}")))?
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, CodeboxError> {
        ractor::call!(
            self.actor,
            DbActorMessage::GetUserByEmail,
            email.to_string()
        )
        .map_err(|e| CodeboxError::RactorError(format!("DbActor GetUserByEmail RPC failed: {e}")))?
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<DbUser>, CodeboxError> {
        ractor::call!(self.actor, DbActorMessage::GetUserById, id).map_err(|e| {
            CodeboxError::RactorError(format!("DbActor GetUserById RPC failed: {e}"))
        })?
    }

    pub async fn create_container(
        &self,
        create: ContainerCreate,
    ) -> Result<DbContainer, CodeboxError> {
        ractor::call!(self.actor, DbActorMessage::CreateContainer, create).map_err(|e| {
            CodeboxError::RactorError(format!("DbActor CreateContainer RPC failed: {e}"))
        })?
    }

    pub async fn list_user_containers(
        &self,
        user_id: i64,
    ) -> Result<Vec<DbContainer>, CodeboxError> {
        ractor::call!(self.actor, DbActorMessage::ListUserContainers, user_id).map_err(|e| {
            CodeboxError::RactorError(format!("DbActor ListUserContainers RPC failed: {e}"))
        })?
    }

    pub async fn get_user_container(
        &self,
        container_id: &str,
        user_id: i64,
    ) -> Result<Option<DbContainer>, CodeboxError> {
        let container_id = container_id.to_string();
        ractor::call!(
            self.actor,
            DbActorMessage::GetUserContainer,
            container_id,
            user_id
        )
        .map_err(|e| {
            CodeboxError::RactorError(format!("DbActor GetUserContainer RPC failed: {e}"))
        })?
    }

    pub async fn patch_container(&self, patch: ContainerPatch) -> Result<(), CodeboxError> {
        ractor::call!(self.actor, DbActorMessage::PatchContainer, patch).map_err(|e| {
            CodeboxError::RactorError(format!("DbActor PatchContainer RPC failed: {e}"))
        })?
    }

    pub async fn delete_container(&self, id: i64) -> Result<(), CodeboxError> {
        ractor::call!(self.actor, DbActorMessage::DeleteContainer, id).map_err(|e| {
            CodeboxError::RactorError(format!("DbActor DeleteContainer RPC failed: {e}"))
        })?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::CreateUser(create, reply) => {
                let res = self.create_user(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetUserByEmail(email, reply) => {
                let res = self.get_user_by_email(&state.pool, &email).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetUserById(id, reply) => {
                let res = self.get_user_by_id(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CreateContainer(create, reply) => {
                let res = self.create_container(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListUserContainers(user_id, reply) => {
                let res = self.list_user_containers(&state.pool, user_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetUserContainer(container_id, user_id, reply) => {
                let res = self
                    .get_user_container(&state.pool, &container_id, user_id)
                    .await;
                let _ = reply.send(res);
            }
            DbActorMessage::PatchContainer(patch, reply) => {
                let res = patch.apply_patch(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteContainer(id, reply) => {
                let res = self.delete_container(&state.pool, id).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn create_user(&self, pool: &SqlitePool, create: UserCreate) -> Result<i64, CodeboxError> {
        let now = Utc::now();
        let res = sqlx::query_scalar::<_, i64>(
            r#"
        INSERT INTO users (email, full_name, hashed_password, is_active, created_at)
        VALUES (?, ?, ?, 1, ?)
        RETURNING id
        "#,
        )
        .bind(normalize_email(&create.email))
        .bind(create.full_name)
        .bind(create.hashed_password)
        .bind(now)
        .fetch_one(pool)
        .await;

        match res {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(CodeboxError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_by_email(
        &self,
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<DbUser>, CodeboxError> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, email, full_name, hashed_password, is_active, created_at
        FROM users
        WHERE email = ?
        "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn get_user_by_id(
        &self,
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<DbUser>, CodeboxError> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, email, full_name, hashed_password, is_active, created_at
        FROM users
        WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn create_container(
        &self,
        pool: &SqlitePool,
        create: ContainerCreate,
    ) -> Result<DbContainer, CodeboxError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbContainer>(
            r#"
        INSERT INTO containers (container_id, container_name, user_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, container_id, container_name, user_id, status, created_at, updated_at
        "#,
        )
        .bind(create.container_id)
        .bind(create.container_name)
        .bind(create.user_id)
        .bind(create.status)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    async fn list_user_containers(
        &self,
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<DbContainer>, CodeboxError> {
        let rows = sqlx::query_as::<_, DbContainer>(
            r#"
        SELECT id, container_id, container_name, user_id, status, created_at, updated_at
        FROM containers
        WHERE user_id = ?
        ORDER BY id
        "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn get_user_container(
        &self,
        pool: &SqlitePool,
        container_id: &str,
        user_id: i64,
    ) -> Result<Option<DbContainer>, CodeboxError> {
        let row = sqlx::query_as::<_, DbContainer>(
            r#"
        SELECT id, container_id, container_name, user_id, status, created_at, updated_at
        FROM containers
        WHERE container_id = ? AND user_id = ?
        "#,
        )
        .bind(container_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn delete_container(&self, pool: &SqlitePool, id: i64) -> Result<(), CodeboxError> {
        let res = sqlx::query("DELETE FROM containers WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(CodeboxError::ContainerNotFound);
        }
        Ok(())
    }
}

/// Emails are matched case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, CodeboxError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| CodeboxError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), CodeboxError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
