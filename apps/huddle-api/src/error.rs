//! Error taxonomy for the chat delivery core.

use thiserror::Error;

/// Failure talking to the storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for StoreError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

/// Why an inbound event was rejected.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The connection has no bound identity.
    #[error("connection is not authenticated")]
    Unauthorized,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ChatError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    /// Stable code sent to clients in `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Message safe to show a client. Storage details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::Storage(_) => "Message could not be stored".to_string(),
            other => other.to_string(),
        }
    }
}

/// Failure while assembling the application at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("WORKER_ID {0} does not fit in 10 bits")]
    WorkerId(u16),
}
