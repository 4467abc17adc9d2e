use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::message::ChatMessage;
use crate::models::participant::ChatParticipant;

/// Narrow persistence interface the delivery core needs from the application.
///
/// Backed by Postgres in production and an in-memory map in tests. The core
/// never assumes it is the only writer.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Durably write one message. The id is assigned by the caller.
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// Membership of a chat. An unknown chat yields an empty list.
    async fn list_participants(&self, chat_id: &str) -> Result<Vec<ChatParticipant>, StoreError>;
}
