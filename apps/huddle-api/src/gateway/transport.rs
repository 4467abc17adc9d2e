//! Connection lifecycle and event dispatch, independent of the socket.

use std::sync::Arc;

use crate::auth::identity::IdentityResolver;
use crate::error::ChatError;

use super::events::{InboundEvent, OutboundEvent};
use super::fanout::{ChatFanoutService, FanoutReport};
use super::outbox::{Delivery, OutboxReceiver, Outboxes};
use super::registry::ConnectionRegistry;
use super::session::{Connection, ConnectionId};

/// What an accepted inbound event did.
#[derive(Debug)]
pub enum EventOutcome {
    Authenticated { user_id: String },
    AlreadyAuthenticated,
    Sent(FanoutReport),
}

pub struct TransportGateway {
    registry: Arc<ConnectionRegistry>,
    outboxes: Arc<Outboxes>,
    fanout: Arc<ChatFanoutService>,
    identity: Arc<dyn IdentityResolver>,
    error_acks: bool,
}

impl TransportGateway {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        outboxes: Arc<Outboxes>,
        fanout: Arc<ChatFanoutService>,
        identity: Arc<dyn IdentityResolver>,
        error_acks: bool,
    ) -> Self {
        Self {
            registry,
            outboxes,
            fanout,
            identity,
            error_acks,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Number of open connections, authenticated or not.
    pub fn open_connections(&self) -> usize {
        self.outboxes.len()
    }

    /// Register a new unauthenticated connection and its outbound queue.
    pub fn on_accept(&self) -> (Connection, OutboxReceiver) {
        let connection = Connection::accept();
        let outbox = self.outboxes.open(connection.id().clone());
        tracing::debug!(connection_id = %connection.id(), "connection accepted");
        (connection, outbox)
    }

    /// Dispatch one inbound event. Rejections are logged and, when error
    /// acknowledgements are enabled, echoed to the connection.
    pub async fn on_event(
        &self,
        connection: &mut Connection,
        event: InboundEvent,
    ) -> Result<EventOutcome, ChatError> {
        let result = self.dispatch(connection, event).await;
        if let Err(err) = &result {
            self.reject(connection.id(), err);
        }
        result
    }

    /// Report a rejected request for `connection_id`.
    pub fn reject(&self, connection_id: &ConnectionId, err: &ChatError) {
        match err {
            ChatError::Storage(_) => {
                tracing::warn!(%connection_id, error = %err, "request failed")
            }
            _ => tracing::debug!(%connection_id, error = %err, "request rejected"),
        }
        if self.error_acks {
            self.push(connection_id, OutboundEvent::error(err));
        }
    }

    /// Close a connection and release its binding. Safe to call more than once.
    pub fn on_disconnect(&self, connection: &mut Connection) {
        let user_id = connection.close();
        if let Some(user_id) = &user_id {
            self.registry.unbind(connection.id(), Some(user_id));
        }
        self.outboxes.close(connection.id());
        tracing::debug!(
            connection_id = %connection.id(),
            user_id = user_id.as_deref().unwrap_or("-"),
            "connection closed"
        );
    }

    /// Best-effort send to one connection. A vanished connection is not an error.
    pub fn push(&self, connection_id: &ConnectionId, event: OutboundEvent) -> bool {
        self.outboxes.push(connection_id, Arc::new(event))
    }

    async fn dispatch(
        &self,
        connection: &mut Connection,
        event: InboundEvent,
    ) -> Result<EventOutcome, ChatError> {
        if connection.is_closed() {
            return Err(ChatError::invalid("connection is closed"));
        }

        match event {
            InboundEvent::Authenticate(payload) => {
                self.authenticate(connection, &payload.user_id).await
            }
            InboundEvent::Message(payload) => {
                let report = self
                    .fanout
                    .handle_incoming_message(connection.id(), &payload.chat_id, &payload.content)
                    .await?;
                Ok(EventOutcome::Sent(report))
            }
        }
    }

    async fn authenticate(
        &self,
        connection: &mut Connection,
        claimed_user_id: &str,
    ) -> Result<EventOutcome, ChatError> {
        let user_id = self
            .identity
            .resolve(claimed_user_id)
            .await?
            .ok_or(ChatError::Unauthorized)?;

        let newly_bound = connection.authenticate(&user_id)?;
        if newly_bound {
            self.registry.bind(&user_id, connection.id());
            tracing::info!(connection_id = %connection.id(), %user_id, "connection authenticated");
        }

        // Repeated authenticates for the same user are acknowledged as well.
        self.push(
            connection.id(),
            OutboundEvent::Authenticated {
                connection_id: connection.id().clone(),
                user_id: user_id.clone(),
            },
        );

        if newly_bound {
            Ok(EventOutcome::Authenticated { user_id })
        } else {
            Ok(EventOutcome::AlreadyAuthenticated)
        }
    }
}

#[cfg(test)]
mod tests {
    use huddle_common::MessageIdGenerator;

    use super::*;
    use crate::auth::identity::TrustedIdentity;
    use crate::db::memory::MemoryChatStore;
    use crate::gateway::events::{AuthenticatePayload, SendMessagePayload};

    fn gateway(error_acks: bool) -> (TransportGateway, Arc<MemoryChatStore>) {
        let store = Arc::new(MemoryChatStore::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let outboxes = Arc::new(Outboxes::new(16));
        let fanout = Arc::new(ChatFanoutService::new(
            store.clone(),
            registry.clone(),
            outboxes.clone(),
            Arc::new(MessageIdGenerator::new(0).unwrap()),
            4000,
        ));
        let gateway = TransportGateway::new(
            registry,
            outboxes,
            fanout,
            Arc::new(TrustedIdentity),
            error_acks,
        );
        (gateway, store)
    }

    fn authenticate(user_id: &str) -> InboundEvent {
        InboundEvent::Authenticate(AuthenticatePayload {
            user_id: user_id.to_string(),
        })
    }

    fn send(chat_id: &str, content: &str) -> InboundEvent {
        InboundEvent::Message(SendMessagePayload {
            chat_id: chat_id.to_string(),
            content: content.to_string(),
        })
    }

    #[tokio::test]
    async fn authenticate_binds_and_acknowledges() {
        let (gateway, _) = gateway(false);
        let (mut conn, mut outbox) = gateway.on_accept();

        let outcome = gateway.on_event(&mut conn, authenticate("usr_1")).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Authenticated { ref user_id } if user_id == "usr_1"));
        assert!(gateway.registry().connections_for("usr_1").contains(conn.id()));

        let ack = outbox.recv().await.unwrap();
        assert!(matches!(ack.as_ref(), OutboundEvent::Authenticated { user_id, .. } if user_id == "usr_1"));

        let again = gateway.on_event(&mut conn, authenticate("usr_1")).await.unwrap();
        assert!(matches!(again, EventOutcome::AlreadyAuthenticated));
    }

    #[tokio::test]
    async fn repeated_authenticate_is_acknowledged_again() {
        let (gateway, _) = gateway(false);
        let (mut conn, mut outbox) = gateway.on_accept();

        gateway.on_event(&mut conn, authenticate("usr_1")).await.unwrap();
        outbox.recv().await.unwrap();

        let again = gateway.on_event(&mut conn, authenticate("usr_1")).await.unwrap();
        assert!(matches!(again, EventOutcome::AlreadyAuthenticated));

        let ack = outbox.try_recv().unwrap();
        assert!(matches!(
            ack.as_ref(),
            OutboundEvent::Authenticated { connection_id, user_id }
                if user_id == "usr_1" && connection_id == conn.id()
        ));
        assert_eq!(gateway.registry().connections_for("usr_1").len(), 1);
    }

    #[tokio::test]
    async fn blank_identity_is_unauthorized() {
        let (gateway, _) = gateway(false);
        let (mut conn, _outbox) = gateway.on_accept();
        let err = gateway.on_event(&mut conn, authenticate("  ")).await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized));
        assert!(!conn.is_authenticated());
    }

    #[tokio::test]
    async fn unauthenticated_send_is_silent_by_default() {
        let (gateway, store) = gateway(false);
        let (mut conn, mut outbox) = gateway.on_accept();

        let err = gateway.on_event(&mut conn, send("c1", "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized));
        assert!(store.messages().is_empty());
        assert!(outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn error_acks_surface_rejections() {
        let (gateway, _) = gateway(true);
        let (mut conn, mut outbox) = gateway.on_accept();

        gateway.on_event(&mut conn, send("c1", "hi")).await.unwrap_err();
        let event = outbox.recv().await.unwrap();
        assert!(matches!(event.as_ref(), OutboundEvent::Error { code: "UNAUTHORIZED", .. }));
    }

    #[tokio::test]
    async fn disconnect_unbinds_and_closes_outbox() {
        let (gateway, store) = gateway(false);
        store.add_participant("c1", "usr_1", false);
        store.add_participant("c1", "usr_2", false);

        let (mut a, _a_outbox) = gateway.on_accept();
        let (mut b, b_outbox) = gateway.on_accept();
        gateway.on_event(&mut a, authenticate("usr_1")).await.unwrap();
        gateway.on_event(&mut b, authenticate("usr_2")).await.unwrap();
        assert_eq!(gateway.open_connections(), 2);

        gateway.on_disconnect(&mut b);
        drop(b_outbox);
        assert!(gateway.registry().connections_for("usr_2").is_empty());
        assert_eq!(gateway.open_connections(), 1);

        let EventOutcome::Sent(report) = gateway.on_event(&mut a, send("c1", "hi")).await.unwrap() else {
            panic!("expected a send");
        };
        assert_eq!(report.attempted, 1);

        let err = gateway.on_event(&mut b, send("c1", "late")).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));
        gateway.on_disconnect(&mut b);
    }

    #[tokio::test]
    async fn disconnect_before_authenticate_is_noop_for_registry() {
        let (gateway, _) = gateway(false);
        let (mut conn, _outbox) = gateway.on_accept();
        gateway.on_disconnect(&mut conn);
        assert_eq!(gateway.registry().connection_count(), 0);
        assert_eq!(gateway.open_connections(), 0);
    }
}
