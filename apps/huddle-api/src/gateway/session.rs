//! Per-connection transport state.

use std::fmt;

use serde::Serialize;

use crate::error::ChatError;

/// Opaque identifier of one live transport session (`conn_` prefixed ULID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(huddle_common::id::prefixed_ulid(
            huddle_common::id::prefix::CONNECTION,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    Unauthenticated,
    Authenticated { user_id: String },
    Closed,
}

/// A live connection as seen by the task that owns its socket.
///
/// Transitions: `Unauthenticated -> Authenticated -> Closed`, and any state
/// to `Closed`. Nothing leaves `Closed`.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
}

impl Connection {
    pub fn accept() -> Self {
        Self {
            id: ConnectionId::generate(),
            state: ConnectionState::Unauthenticated,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, ConnectionState::Authenticated { .. })
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Bind this connection to `user_id`.
    ///
    /// Returns `true` when the connection was newly bound and `false` when it
    /// was already bound to the same user.
    pub fn authenticate(&mut self, user_id: &str) -> Result<bool, ChatError> {
        match &self.state {
            ConnectionState::Unauthenticated => {
                self.state = ConnectionState::Authenticated {
                    user_id: user_id.to_string(),
                };
                Ok(true)
            }
            ConnectionState::Authenticated { user_id: bound } if bound == user_id => Ok(false),
            ConnectionState::Authenticated { .. } => Err(ChatError::invalid(
                "connection is already authenticated as another user",
            )),
            ConnectionState::Closed => Err(ChatError::invalid("connection is closed")),
        }
    }

    /// Move to `Closed`, returning the user the connection was bound to.
    pub fn close(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, ConnectionState::Closed) {
            ConnectionState::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }
}
