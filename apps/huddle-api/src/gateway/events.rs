//! Wire-format events exchanged over the WebSocket.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}` with
//! camelCase payload fields.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::models::message::ChatMessage;

use super::session::ConnectionId;

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    Authenticate(AuthenticatePayload),
    Message(SendMessagePayload),
}

impl InboundEvent {
    /// Parse a text frame. Anything that is not a known event is `InvalidRequest`.
    pub fn parse(text: &str) -> Result<Self, ChatError> {
        serde_json::from_str(text).map_err(|e| ChatError::invalid(format!("malformed event: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatePayload {
    #[serde(default, alias = "user_id")]
    pub user_id: String,
}

/// Missing fields deserialize as empty strings and are rejected by the fanout service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(default, alias = "chat_id")]
    pub chat_id: String,
    #[serde(default)]
    pub content: String,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum OutboundEvent {
    /// A persisted chat message.
    Message(ChatMessage),
    /// The connection is bound to `user_id`. Sent on every successful authenticate.
    Authenticated {
        connection_id: ConnectionId,
        user_id: String,
    },
    /// A rejected request. Only sent when error acknowledgements are enabled.
    Error { code: &'static str, message: String },
}

impl OutboundEvent {
    pub fn error(err: &ChatError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.client_message(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
