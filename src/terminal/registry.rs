use crate::error::CodeboxError;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type SessionId = Uuid;

const NOTICE_CAPACITY: usize = 8;
/// Inbox slots broadcasts may never take; the final `Closed` notice needs one.
const CLOSE_HEADROOM: usize = 1;

/// Pushed from the registry into a live terminal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Forward text to the client and keep going.
    Message(String),
    /// Tell the client why, then end the session.
    Closed { reason: String },
}

#[derive(Debug)]
pub enum SessionRegistryMessage {
    /// Track a new session for (container_id, user_id); replies with its id and notice inbox.
    Register(
        String,
        i64,
        RpcReplyPort<(SessionId, mpsc::Receiver<SessionNotice>)>,
    ),

    /// Forget a session. Unknown ids are ignored.
    Unregister(SessionId),

    ActiveCount(RpcReplyPort<usize>),

    /// Ids of sessions attached to a container.
    SessionsFor(String, RpcReplyPort<Vec<SessionId>>),

    /// Send a text notice to every session.
    Broadcast(String),

    /// Close every session attached to a container.
    CloseContainer { container_id: String, reason: String },
}

#[derive(Clone)]
pub struct SessionRegistryHandle {
    actor: ActorRef<SessionRegistryMessage>,
}

impl SessionRegistryHandle {
    pub async fn register(
        &self,
        container_id: &str,
        user_id: i64,
    ) -> Result<(SessionId, mpsc::Receiver<SessionNotice>), CodeboxError> {
        ractor::call!(
            self.actor,
            SessionRegistryMessage::Register,
            container_id.to_string(),
            user_id
        )
        .map_err(|e| CodeboxError::RactorError(format!("Register RPC failed: {e}")))
    }

    pub fn unregister(&self, id: SessionId) {
        let _ = ractor::cast!(self.actor, SessionRegistryMessage::Unregister(id));
    }

    pub async fn active_count(&self) -> Result<usize, CodeboxError> {
        ractor::call!(self.actor, SessionRegistryMessage::ActiveCount)
            .map_err(|e| CodeboxError::RactorError(format!("ActiveCount RPC failed: {e}")))
    }

    pub async fn sessions_for(&self, container_id: &str) -> Result<Vec<SessionId>, CodeboxError> {
        ractor::call!(
            self.actor,
            SessionRegistryMessage::SessionsFor,
            container_id.to_string()
        )
        .map_err(|e| CodeboxError::RactorError(format!("SessionsFor RPC failed: {e}")))
    }

    pub fn broadcast(&self, text: impl Into<String>) {
        let _ = ractor::cast!(self.actor, SessionRegistryMessage::Broadcast(text.into()));
    }

    pub fn close_container(&self, container_id: &str, reason: impl Into<String>) {
        let _ = ractor::cast!(
            self.actor,
            SessionRegistryMessage::CloseContainer {
                container_id: container_id.to_string(),
                reason: reason.into(),
            }
        );
    }
}

struct Session {
    container_id: String,
    user_id: i64,
    notices: mpsc::Sender<SessionNotice>,
}

struct SessionRegistry;

#[ractor::async_trait]
impl Actor for SessionRegistry {
    type Msg = SessionRegistryMessage;
    type State = HashMap<SessionId, Session>;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!("SessionRegistry initialized");
        Ok(HashMap::new())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        sessions: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SessionRegistryMessage::Register(container_id, user_id, reply) => {
                let id = Uuid::new_v4();
                let (tx, rx) = mpsc::channel(NOTICE_CAPACITY);
                info!(session_id = %id, container_id = %container_id, user_id, "terminal session opened");
                sessions.insert(
                    id,
                    Session {
                        container_id,
                        user_id,
                        notices: tx,
                    },
                );
                let _ = reply.send((id, rx));
            }
            SessionRegistryMessage::Unregister(id) => {
                if let Some(session) = sessions.remove(&id) {
                    info!(
                        session_id = %id,
                        container_id = %session.container_id,
                        user_id = session.user_id,
                        "terminal session closed"
                    );
                }
            }
            SessionRegistryMessage::ActiveCount(reply) => {
                let _ = reply.send(sessions.len());
            }
            SessionRegistryMessage::SessionsFor(container_id, reply) => {
                let ids = sessions
                    .iter()
                    .filter(|(_, s)| s.container_id == container_id)
                    .map(|(id, _)| *id)
                    .collect();
                let _ = reply.send(ids);
            }
            SessionRegistryMessage::Broadcast(text) => {
                for (id, session) in sessions.iter() {
                    // The registry is the only sender, so capacity cannot shrink under us.
                    let delivered = session.notices.capacity() > CLOSE_HEADROOM
                        && session
                            .notices
                            .try_send(SessionNotice::Message(text.clone()))
                            .is_ok();
                    if !delivered {
                        warn!(session_id = %id, "dropped broadcast for busy or gone session");
                    }
                }
            }
            SessionRegistryMessage::CloseContainer {
                container_id,
                reason,
            } => {
                sessions.retain(|id, session| {
                    if session.container_id != container_id {
                        return true;
                    }
                    debug!(session_id = %id, container_id = %session.container_id, "closing session");
                    if let Err(e) = session.notices.try_send(SessionNotice::Closed {
                        reason: reason.clone(),
                    }) {
                        debug!(session_id = %id, error = %e, "close notice not delivered");
                    }
                    false
                });
            }
        }
        Ok(())
    }
}

/// Spawn the session registry and return a cloneable handle.
pub async fn spawn_registry() -> Result<SessionRegistryHandle, CodeboxError> {
    let (actor, _jh) = ractor::Actor::spawn(None, SessionRegistry, ())
        .await
        .map_err(|e| CodeboxError::RactorError(format!("failed to spawn SessionRegistry: {e}")))?;
    Ok(SessionRegistryHandle { actor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_count_and_unregister() {
        let registry = spawn_registry().await.unwrap();
        let (a, _rx_a) = registry.register("c1", 1).await.unwrap();
        let (_b, _rx_b) = registry.register("c2", 1).await.unwrap();
        assert_eq!(registry.active_count().await.unwrap(), 2);
        assert_eq!(registry.sessions_for("c1").await.unwrap(), vec![a]);

        registry.unregister(a);
        registry.unregister(a);
        assert_eq!(registry.active_count().await.unwrap(), 1);
        assert!(registry.sessions_for("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn close_container_notifies_only_its_sessions() {
        let registry = spawn_registry().await.unwrap();
        let (_a, mut rx_a) = registry.register("c1", 1).await.unwrap();
        let (_b, mut rx_b) = registry.register("c2", 2).await.unwrap();

        registry.close_container("c1", "container stopped");
        assert_eq!(registry.active_count().await.unwrap(), 1);
        assert_eq!(
            rx_a.recv().await,
            Some(SessionNotice::Closed {
                reason: "container stopped".to_string()
            })
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_notice_fits_behind_a_full_inbox() {
        let registry = spawn_registry().await.unwrap();
        let (_a, mut rx) = registry.register("c1", 1).await.unwrap();

        for i in 0..NOTICE_CAPACITY + 2 {
            registry.broadcast(format!("m{i}"));
        }
        registry.close_container("c1", "container stopped");
        assert_eq!(registry.active_count().await.unwrap(), 0);

        let mut received = Vec::new();
        while let Some(notice) = rx.recv().await {
            received.push(notice);
        }
        let kept = NOTICE_CAPACITY - CLOSE_HEADROOM;
        assert_eq!(received.len(), kept + 1);
        assert_eq!(received[0], SessionNotice::Message("m0".to_string()));
        assert_eq!(
            received[kept],
            SessionNotice::Closed {
                reason: "container stopped".to_string()
            }
        );
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone() {
        let registry = spawn_registry().await.unwrap();
        let (_a, mut rx_a) = registry.register("c1", 1).await.unwrap();
        let (_b, mut rx_b) = registry.register("c2", 2).await.unwrap();

        registry.broadcast("maintenance in 5 minutes");
        // Ordered after the cast in the mailbox.
        registry.active_count().await.unwrap();

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(
                rx.recv().await,
                Some(SessionNotice::Message("maintenance in 5 minutes".to_string()))
            );
        }
    }
}
