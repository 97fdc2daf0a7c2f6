use serde::{Deserialize, Serialize};
use thiserror::Error;

/// GraphQL messages that mean the session's cart can no longer be used.
const CART_INVALIDATING_MESSAGES: &[&str] = &[
    "The current user cannot perform operations on cart",
    "The cart isn't active",
    "The cart isn\u{2019}t active",
];

/// Failure reported by a remote collaborator call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("GraphQL error: {0}")]
    GraphQl(String),
    #[error("Challenge token unavailable: {0}")]
    Challenge(String),
}

impl RemoteError {
    /// True when the error proves the active cart identifier is dead and a
    /// fresh cart has to be created.
    pub fn invalidates_cart(&self) -> bool {
        match self {
            RemoteError::Status(403) => true,
            RemoteError::GraphQl(message) => {
                let message = message.to_lowercase();
                CART_INVALIDATING_MESSAGES
                    .iter()
                    .any(|known| message.starts_with(&known.to_lowercase()))
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Remote error: {0}")]
    RemoteError(#[from] RemoteError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
