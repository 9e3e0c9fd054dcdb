use super::decode::{Utf8Decoder, is_echo};
use super::registry::SessionNotice;
use crate::runtime::TerminalIo;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Why a bridged session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    ClientClosed,
    ShellExited,
    Closed(String),
    Failed(String),
}

/// Pump frames between the browser and the shell until either side ends.
///
/// Client text/binary frames go to the shell's stdin. Shell output goes back
/// as text frames, minus chunks that only echo the last client input.
pub async fn run_session(
    socket: WebSocket,
    io: TerminalIo,
    mut notices: mpsc::Receiver<SessionNotice>,
) -> SessionEnd {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let TerminalIo {
        mut output,
        mut input,
    } = io;
    let mut decoder = Utf8Decoder::default();
    let mut last_input = String::new();

    let end = loop {
        tokio::select! {
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    last_input = text.as_str().to_string();
                    if let Err(e) = write_all(&mut input, text.as_str().as_bytes()).await {
                        break SessionEnd::Failed(format!("stdin write failed: {e}"));
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    if let Err(e) = write_all(&mut input, &bytes).await {
                        break SessionEnd::Failed(format!("stdin write failed: {e}"));
                    }
                }
                Some(Ok(Message::Close(_))) | None => break SessionEnd::ClientClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "websocket receive failed");
                    break SessionEnd::ClientClosed;
                }
            },
            chunk = output.next() => match chunk {
                Some(Ok(bytes)) => {
                    let text = decoder.push(&bytes);
                    if text.is_empty() || is_echo(&text, &last_input) {
                        continue;
                    }
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break SessionEnd::ClientClosed;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "terminal output failed");
                    break SessionEnd::Failed(e.to_string());
                }
                None => break SessionEnd::ShellExited,
            },
            notice = notices.recv() => match notice {
                Some(SessionNotice::Message(text)) => {
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break SessionEnd::ClientClosed;
                    }
                }
                Some(SessionNotice::Closed { reason }) => {
                    let _ = ws_tx
                        .send(Message::Text(format!("\r\n[{reason}]\r\n").into()))
                        .await;
                    break SessionEnd::Closed(reason);
                }
                None => break SessionEnd::Closed("session registry gone".to_string()),
            },
        }
    };

    let _ = input.shutdown().await;
    if end != SessionEnd::ClientClosed {
        let _ = ws_tx.send(Message::Close(None)).await;
    }
    end
}

async fn write_all(
    input: &mut crate::runtime::TerminalInput,
    bytes: &[u8],
) -> std::io::Result<()> {
    input.write_all(bytes).await?;
    input.flush().await
}
