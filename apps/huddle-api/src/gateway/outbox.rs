//! Per-connection outbound queues.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::events::OutboundEvent;
use super::session::ConnectionId;

pub type OutboxReceiver = mpsc::Receiver<Arc<OutboundEvent>>;

/// Best-effort delivery of an event to one connection.
pub trait Delivery: Send + Sync {
    /// Queue `event` for `connection_id`. Returns `false` when the connection
    /// is gone or cannot take more events; callers never treat that as an error.
    fn push(&self, connection_id: &ConnectionId, event: Arc<OutboundEvent>) -> bool;
}

/// Bounded queue per open connection. The socket task drains its receiver.
pub struct Outboxes {
    senders: DashMap<ConnectionId, mpsc::Sender<Arc<OutboundEvent>>>,
    capacity: usize,
}

impl Outboxes {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Create the queue for a newly accepted connection.
    pub fn open(&self, connection_id: ConnectionId) -> OutboxReceiver {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders.insert(connection_id, tx);
        rx
    }

    /// Drop the queue. Later pushes to this id are misses.
    pub fn close(&self, connection_id: &ConnectionId) -> bool {
        self.senders.remove(connection_id).is_some()
    }

    /// Number of open connections, authenticated or not.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl Delivery for Outboxes {
    fn push(&self, connection_id: &ConnectionId, event: Arc<OutboundEvent>) -> bool {
        let Some(tx) = self.senders.get(connection_id).map(|tx| tx.clone()) else {
            tracing::debug!(%connection_id, "push to unknown connection dropped");
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%connection_id, "outbox full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(%connection_id, "push to closed connection dropped");
                false
            }
        }
    }
}
