//! # Domain Errors
//!
//! Error taxonomy shared by the lookup, registry, stores and input parsing.

use thiserror::Error;

use crate::domain::types::{ChatId, MessageId};

/// Classified failure of a train status query.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("train {0} not found")]
    NotFound(String),
    #[error("upstream error for train {train}: status code {status}")]
    Upstream { train: String, status: u16 },
    #[error("transport error for train {train}: {message}")]
    Transport { train: String, message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date format: {0:?}")]
pub struct DateParseError(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("empty callback payload")]
    Empty,
    #[error("unknown callback action {0:?}")]
    UnknownAction(String),
    #[error("malformed callback payload {0:?}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("subscription for chat {found} does not belong to chat {expected}")]
    ChatMismatch { expected: ChatId, found: ChatId },
    #[error("subscription chat {chat_id} message {message_id} not found")]
    NotFound { chat_id: ChatId, message_id: MessageId },
    #[error(transparent)]
    Storage(#[from] StoreError),
}
