use axum::http::StatusCode;
use thiserror::Error;

/// Per-turn error taxonomy for the agent endpoint.
///
/// Each variant maps to one HTTP status. Internal plumbing keeps using
/// `anyhow::Result` for ad-hoc context chains; the gateway converts to this
/// enum at the response boundary.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Message is required")]
    MissingMessage,

    #[error("Authentication required")]
    Unauthenticated,

    /// Agent/runtime failure while executing the turn. The durable record is
    /// left untouched: persistence only happens after the turn stream drains.
    #[error("{0}")]
    Runtime(String),

    /// Durable read/write failure. Fatal for the turn, no in-memory fallback.
    #[error("storage: {0}")]
    Storage(#[source] anyhow::Error),
}

impl TurnError {
    pub fn status(&self) -> StatusCode {
        match self {
            TurnError::MissingMessage => StatusCode::BAD_REQUEST,
            TurnError::Unauthenticated => StatusCode::UNAUTHORIZED,
            TurnError::Runtime(_) | TurnError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
