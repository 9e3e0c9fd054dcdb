use crate::db::DbContainer;
use crate::error::CodeboxError;
use crate::server::guards::CurrentUser;
use crate::server::routes::MessageResponse;
use crate::server::state::CodeboxState;
use crate::utils::logging::debug_pretty_json;
use crate::workspace::{
    self, FileSystemItem, ItemKind, filter_by_parent, is_plain_file_name, normalize_newlines,
    parse_listing, single_file_archive,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, info};

pub fn router() -> Router<CodeboxState> {
    Router::new()
        .route("/docker/filesystem/{container_id}", get(get_filesystem))
        .route(
            "/docker/filesystem/{container_id}/{path}",
            get(get_folder_content),
        )
        .route("/docker/file-content/{container_id}", get(get_file_content))
        .route("/docker/save-file-content", post(save_file_content))
        .route("/docker/move-item", post(move_item))
        .route("/docker/create-folder", post(create_folder))
        .route("/docker/create-file", post(create_file))
        .route("/docker/remove-path", post(remove_path))
}

#[derive(Debug, Deserialize)]
pub struct FileContentQuery {
    pub file_path: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveFileRequest {
    pub container_id: String,
    pub name: String,
    pub parent_path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveItemRequest {
    pub container_id: String,
    pub source_path: String,
    pub destination_path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub container_id: String,
    pub folder_path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub container_id: String,
    pub file_path: String,
}

#[derive(Debug, Deserialize)]
pub struct RemovePathRequest {
    pub container_id: String,
    pub path: String,
}

/// Directories first, then files, under the workspace root.
async fn collect_tree(
    state: &CodeboxState,
    container: &DbContainer,
) -> Result<Vec<FileSystemItem>, CodeboxError> {
    let root = state.workspace.root.as_str();
    let id = container.container_id.as_str();

    let dirs = state
        .runtime
        .exec(id, workspace::find_command(root, ItemKind::Directory))
        .await?;
    let files = state
        .runtime
        .exec(id, workspace::find_command(root, ItemKind::File))
        .await?;

    if !dirs.success() && !files.success() {
        return Err(CodeboxError::CommandFailed {
            action: "retrieving file system structure",
        });
    }

    let mut items = parse_listing(&dirs.stdout_lossy(), ItemKind::Directory);
    items.extend(parse_listing(&files.stdout_lossy(), ItemKind::File));
    debug_pretty_json("file tree", &items);
    Ok(items)
}

/// Run a mutating command and map a non-zero exit to `CommandFailed`.
async fn run_checked(
    state: &CodeboxState,
    container: &DbContainer,
    argv: Vec<String>,
    action: &'static str,
) -> Result<(), CodeboxError> {
    let out = state.runtime.exec(&container.container_id, argv).await?;
    if !out.success() {
        debug!(container_id = %container.container_id, exit_code = out.exit_code, action, "command failed");
        return Err(CodeboxError::CommandFailed { action });
    }
    Ok(())
}

/// GET /docker/filesystem/{container_id}
async fn get_filesystem(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    Path(container_id): Path<String>,
) -> Result<Json<Vec<FileSystemItem>>, CodeboxError> {
    let container = state.running_container(&user, &container_id).await?;
    Ok(Json(collect_tree(&state, &container).await?))
}

/// GET /docker/filesystem/{container_id}/{path}
///
/// `path` is the base64 of a directory; items whose parent path contains it are returned.
async fn get_folder_content(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    Path((container_id, encoded)): Path<(String, String)>,
) -> Result<Json<Vec<FileSystemItem>>, CodeboxError> {
    let container = state.running_container(&user, &container_id).await?;
    let dir = workspace::decode_path_segment(&encoded).ok_or_else(|| {
        CodeboxError::InvalidRequest("path must be base64-encoded UTF-8".to_string())
    })?;
    let items = collect_tree(&state, &container).await?;
    Ok(Json(filter_by_parent(items, &dir)))
}

/// GET /docker/file-content/{container_id}?file_path=..
async fn get_file_content(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    Path(container_id): Path<String>,
    query: Result<Query<FileContentQuery>, QueryRejection>,
) -> Result<Json<String>, CodeboxError> {
    let Query(query) = query?;
    let container = state.running_container(&user, &container_id).await?;
    let out = state
        .runtime
        .exec(
            &container.container_id,
            workspace::read_file_command(&query.file_path),
        )
        .await?;
    if !out.success() {
        return Err(CodeboxError::CommandFailed {
            action: "retrieving file content",
        });
    }
    Ok(Json(out.stdout_lossy()))
}

/// POST /docker/save-file-content
async fn save_file_content(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<SaveFileRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let Json(req) = payload?;
    if !is_plain_file_name(&req.name) {
        return Err(CodeboxError::InvalidRequest(
            "name must be a single path component".to_string(),
        ));
    }

    let container = state.running_container(&user, &req.container_id).await?;
    let content = normalize_newlines(&req.content);
    let archive = single_file_archive(&req.name, content.as_bytes())?;
    state
        .runtime
        .upload_archive(&container.container_id, &req.parent_path, archive)
        .await?;

    info!(
        container_id = %container.container_id,
        parent_path = %req.parent_path,
        name = %req.name,
        bytes = content.len(),
        "file saved"
    );
    Ok(Json(MessageResponse::new("File content saved successfully")))
}

/// POST /docker/move-item
async fn move_item(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<MoveItemRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let Json(req) = payload?;
    let container = state.running_container(&user, &req.container_id).await?;
    run_checked(
        &state,
        &container,
        workspace::move_command(&req.source_path, &req.destination_path),
        "moving item",
    )
    .await?;
    Ok(Json(MessageResponse::new("Item moved successfully")))
}

/// POST /docker/create-folder
async fn create_folder(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreateFolderRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let Json(req) = payload?;
    let container = state.running_container(&user, &req.container_id).await?;
    run_checked(
        &state,
        &container,
        workspace::make_dir_command(&req.folder_path),
        "creating folder",
    )
    .await?;
    Ok(Json(MessageResponse::new("Folder created successfully")))
}

/// POST /docker/create-file
async fn create_file(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreateFileRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let Json(req) = payload?;
    let container = state.running_container(&user, &req.container_id).await?;
    run_checked(
        &state,
        &container,
        workspace::touch_command(&req.file_path),
        "creating file",
    )
    .await?;
    Ok(Json(MessageResponse::new("File created successfully")))
}

/// POST /docker/remove-path
async fn remove_path(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<RemovePathRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, CodeboxError> {
    let Json(req) = payload?;
    let container = state.running_container(&user, &req.container_id).await?;
    run_checked(
        &state,
        &container,
        workspace::remove_command(&req.path),
        "removing path",
    )
    .await?;
    Ok(Json(MessageResponse::new("Path removed successfully")))
}
