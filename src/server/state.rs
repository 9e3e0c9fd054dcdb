use crate::auth::TokenService;
use crate::config::{Config, WorkspaceConfig};
use crate::db::{DbActorHandle, DbContainer, DbUser};
use crate::error::CodeboxError;
use crate::runtime::ContainerRuntime;
use crate::terminal::SessionRegistryHandle;
use std::sync::Arc;

const RUNNING: &str = "running";

#[derive(Clone)]
pub struct CodeboxState {
    pub db: DbActorHandle,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub tokens: Arc<TokenService>,
    pub sessions: SessionRegistryHandle,
    pub workspace: Arc<WorkspaceConfig>,
    pub frontend_origin: Option<Arc<str>>,
}

impl CodeboxState {
    pub fn new(
        cfg: &Config,
        db: DbActorHandle,
        runtime: Arc<dyn ContainerRuntime>,
        sessions: SessionRegistryHandle,
    ) -> Self {
        Self {
            db,
            runtime,
            tokens: Arc::new(TokenService::new(
                &cfg.auth.jwt_secret,
                cfg.auth.token_ttl_minutes,
            )),
            sessions,
            workspace: Arc::new(cfg.workspace.clone()),
            frontend_origin: cfg.basic.frontend_origin().map(Arc::from),
        }
    }

    /// The user's container row, or `ContainerNotFound` when it is missing or someone else's.
    pub async fn owned_container(
        &self,
        user: &DbUser,
        container_id: &str,
    ) -> Result<DbContainer, CodeboxError> {
        self.db
            .get_user_container(container_id, user.id)
            .await?
            .ok_or(CodeboxError::ContainerNotFound)
    }

    /// Like [`Self::owned_container`], additionally requiring the engine to report it running.
    pub async fn running_container(
        &self,
        user: &DbUser,
        container_id: &str,
    ) -> Result<DbContainer, CodeboxError> {
        let container = self.owned_container(user, container_id).await?;
        let status = self.runtime.container_status(&container.container_id).await?;
        if status != RUNNING {
            return Err(CodeboxError::ContainerNotRunning);
        }
        Ok(container)
    }
}
