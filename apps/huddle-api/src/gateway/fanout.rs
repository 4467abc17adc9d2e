//! Turns an inbound send into a persisted message and a best-effort delivery set.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use huddle_common::MessageIdGenerator;

use crate::db::store::ChatStore;
use crate::error::ChatError;
use crate::models::message::ChatMessage;

use super::events::OutboundEvent;
use super::outbox::Delivery;
use super::registry::ConnectionRegistry;
use super::session::ConnectionId;

/// Outcome of one successful send.
#[derive(Debug, Clone)]
pub struct FanoutReport {
    pub message: ChatMessage,
    /// Push attempts, one per resolved recipient connection.
    pub attempted: usize,
    /// Pushes that were queued on a live connection.
    pub delivered: usize,
}

pub struct ChatFanoutService {
    store: Arc<dyn ChatStore>,
    registry: Arc<ConnectionRegistry>,
    delivery: Arc<dyn Delivery>,
    ids: Arc<MessageIdGenerator>,
    max_content_len: usize,
}

impl ChatFanoutService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        registry: Arc<ConnectionRegistry>,
        delivery: Arc<dyn Delivery>,
        ids: Arc<MessageIdGenerator>,
        max_content_len: usize,
    ) -> Self {
        Self {
            store,
            registry,
            delivery,
            ids,
            max_content_len,
        }
    }

    /// Persist a message from `sender` and push it to every participant's live connections.
    ///
    /// Persistence is the durability boundary: once the insert succeeds the
    /// send succeeds, even if participants cannot be loaded or nobody is
    /// connected. An insert failure aborts before any push.
    pub async fn handle_incoming_message(
        &self,
        sender: &ConnectionId,
        chat_id: &str,
        content: &str,
    ) -> Result<FanoutReport, ChatError> {
        let user_id = self
            .registry
            .user_for(sender)
            .ok_or(ChatError::Unauthorized)?;

        let chat_id = chat_id.trim();
        if chat_id.is_empty() {
            return Err(ChatError::invalid("chatId is required"));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::invalid("content is required"));
        }
        if content.chars().count() > self.max_content_len {
            return Err(ChatError::invalid(format!(
                "content must be {} characters or fewer",
                self.max_content_len
            )));
        }

        let message = ChatMessage {
            id: self.ids.next_id(),
            chat_id: chat_id.to_string(),
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        if let Err(err) = self.store.insert_message(&message).await {
            tracing::warn!(
                message_id = message.id,
                chat_id = %message.chat_id,
                error = %err,
                "message persist failed, send aborted"
            );
            return Err(err.into());
        }

        let (attempted, delivered) = self.deliver(&message).await;

        tracing::debug!(
            message_id = message.id,
            chat_id = %message.chat_id,
            user_id = %message.user_id,
            attempted,
            delivered,
            "message fanned out"
        );

        Ok(FanoutReport {
            message,
            attempted,
            delivered,
        })
    }

    async fn deliver(&self, message: &ChatMessage) -> (usize, usize) {
        let participants = match self.store.list_participants(&message.chat_id).await {
            Ok(participants) => participants,
            Err(err) => {
                tracing::warn!(
                    message_id = message.id,
                    chat_id = %message.chat_id,
                    error = %err,
                    "participant lookup failed, message stored without live delivery"
                );
                return (0, 0);
            }
        };

        let event = Arc::new(OutboundEvent::Message(message.clone()));
        let mut seen = HashSet::with_capacity(participants.len());
        let mut attempted = 0;
        let mut delivered = 0;

        for participant in participants {
            if !seen.insert(participant.user_id.clone()) {
                continue;
            }
            for connection_id in self.registry.connections_for(&participant.user_id) {
                attempted += 1;
                if self.delivery.push(&connection_id, event.clone()) {
                    delivered += 1;
                }
            }
        }

        (attempted, delivered)
    }
}
