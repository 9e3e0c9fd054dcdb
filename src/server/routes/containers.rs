use crate::db::{ContainerCreate, ContainerPatch, DbContainer};
use crate::error::{CodeboxError, RuntimeError};
use crate::server::guards::CurrentUser;
use crate::server::routes::MessageResponse;
use crate::server::state::CodeboxState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tracing::{info, warn};

pub fn router() -> Router<CodeboxState> {
    Router::new()
        .route("/docker/create-container", post(create_container))
        .route("/docker/user-containers", get(list_user_containers))
        .route(
            "/docker/start-container/{container_id}",
            put(start_user_container),
        )
        .route(
            "/docker/stop-container/{container_id}",
            put(stop_user_container),
        )
        .route(
            "/docker/delete-container/{container_id}",
            delete(delete_user_container),
        )
}

#[derive(Debug, Serialize)]
pub struct ContainerList {
    pub containers: Vec<DbContainer>,
}

/// POST /docker/create-container
///
/// Pulls the workspace image and creates (without starting) a container owned
/// by the caller.
async fn create_container(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DbContainer>, CodeboxError> {
    let image = state.workspace.image.as_str();
    info!(user_id = user.id, image, "creating workspace container");

    state.runtime.pull_image(image).await?;
    let created = state.runtime.create_container(image).await?;

    let row = state
        .db
        .create_container(ContainerCreate {
            container_id: created.id.clone(),
            container_name: image.to_string(),
            user_id: user.id,
            status: created.status,
        })
        .await;

    match row {
        Ok(row) => {
            info!(user_id = user.id, container_id = %row.container_id, status = %row.status, "container created");
            Ok(Json(row))
        }
        Err(e) => {
            // Do not leave an engine container nobody can reach.
            if let Err(cleanup) = state.runtime.remove_container(&created.id).await {
                warn!(container_id = %created.id, error = %cleanup, "orphan container cleanup failed");
            }
            Err(e)
        }
    }
}

/// GET /docker/user-containers
async fn list_user_containers(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ContainerList>, CodeboxError> {
    let containers = state.db.list_user_containers(user.id).await?;
    Ok(Json(ContainerList { containers }))
}

/// PUT /docker/start-container/{container_id}
async fn start_user_container(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    Path(container_id): Path<String>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let container = state.owned_container(&user, &container_id).await?;
    state.runtime.start_container(&container.container_id).await?;
    state
        .db
        .patch_container(ContainerPatch {
            id: container.id,
            status: Some("running".to_string()),
        })
        .await?;

    info!(user_id = user.id, container_id = %container.container_id, "container started");
    Ok(Json(MessageResponse::new("Container started successfully")))
}

/// PUT /docker/stop-container/{container_id}
async fn stop_user_container(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    Path(container_id): Path<String>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let container = state.owned_container(&user, &container_id).await?;
    state.runtime.stop_container(&container.container_id).await?;
    state
        .db
        .patch_container(ContainerPatch {
            id: container.id,
            status: Some("exited".to_string()),
        })
        .await?;
    state
        .sessions
        .close_container(&container.container_id, "container stopped");

    info!(user_id = user.id, container_id = %container.container_id, "container stopped");
    Ok(Json(MessageResponse::new("Container stopped successfully")))
}

/// DELETE /docker/delete-container/{container_id}
///
/// A container already gone from the engine still has its row removed.
async fn delete_user_container(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    Path(container_id): Path<String>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let container = state.owned_container(&user, &container_id).await?;

    let engine = async {
        state.runtime.stop_container(&container.container_id).await?;
        state.runtime.remove_container(&container.container_id).await
    };
    match engine.await {
        Ok(()) => {}
        Err(RuntimeError::ContainerNotFound) => {
            warn!(container_id = %container.container_id, "container already gone from engine");
        }
        Err(e) => return Err(e.into()),
    }

    state
        .sessions
        .close_container(&container.container_id, "container deleted");
    state.db.delete_container(container.id).await?;

    info!(user_id = user.id, container_id = %container.container_id, "container deleted");
    Ok(Json(MessageResponse::new("Container deleted successfully")))
}
