use crate::error::CodeboxError;
use crate::server::guards::CurrentUser;
use crate::server::state::CodeboxState;
use crate::terminal::run_session;
use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use tracing::{info, warn};

pub fn router() -> Router<CodeboxState> {
    Router::new().route("/docker-ws/{container_id}", get(terminal_ws))
}

/// GET /docker-ws/{container_id}
///
/// Ownership and running state are checked before the upgrade so failures
/// surface as ordinary HTTP errors.
async fn terminal_ws(
    State(state): State<CodeboxState>,
    CurrentUser(user): CurrentUser,
    Path(container_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, CodeboxError> {
    let container = state.running_container(&user, &container_id).await?;
    let user_id = user.id;
    Ok(ws.on_upgrade(move |socket| {
        serve_terminal(state, socket, container.container_id, user_id)
    }))
}

async fn serve_terminal(
    state: CodeboxState,
    mut socket: WebSocket,
    container_id: String,
    user_id: i64,
) {
    let io = match state
        .runtime
        .open_terminal(&container_id, &state.workspace.shell)
        .await
    {
        Ok(io) => io,
        Err(e) => {
            warn!(container_id = %container_id, error = %e, "failed to open terminal");
            let _ = socket
                .send(Message::Text(format!("\r\n[failed to open terminal: {e}]\r\n").into()))
                .await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (session_id, notices) = match state.sessions.register(&container_id, user_id).await {
        Ok(registered) => registered,
        Err(e) => {
            warn!(container_id = %container_id, error = %e, "failed to register terminal session");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let end = run_session(socket, io, notices).await;
    info!(session_id = %session_id, container_id = %container_id, user_id, end = ?end, "terminal session ended");
    state.sessions.unregister(session_id);
}
