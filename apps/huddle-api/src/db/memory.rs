//! In-memory storage collaborator, used when no database is configured and in tests.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::db::store::ChatStore;
use crate::error::StoreError;
use crate::models::message::ChatMessage;
use crate::models::participant::ChatParticipant;

#[derive(Default)]
pub struct MemoryChatStore {
    messages: Mutex<MessageLog>,
    participants: DashMap<String, Vec<ChatParticipant>>,
}

#[derive(Default)]
struct MessageLog {
    ids: HashSet<i64>,
    entries: Vec<ChatMessage>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to a chat. Adding an existing participant is a no-op.
    pub fn add_participant(&self, chat_id: &str, user_id: &str, is_admin: bool) {
        let mut members = self.participants.entry(chat_id.to_string()).or_default();
        if members.iter().any(|p| p.user_id == user_id) {
            return;
        }
        members.push(ChatParticipant {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            is_admin,
            joined_at: Utc::now(),
        });
    }

    /// Snapshot of every stored message in insertion order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().entries.clone()
    }

    pub fn messages_in(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .entries
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut log = self.messages.lock();
        if !log.ids.insert(message.id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate message id {}",
                message.id
            )));
        }
        log.entries.push(message.clone());
        Ok(())
    }

    async fn list_participants(&self, chat_id: &str) -> Result<Vec<ChatParticipant>, StoreError> {
        Ok(self
            .participants
            .get(chat_id)
            .map(|members| members.clone())
            .unwrap_or_default())
    }
}
