//! # Domain Traits
//!
//! Abstract interfaces for the collaborators of the core (chat transport, train
//! data, persistence). Infrastructure provides the real implementations; tests use
//! in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::domain::errors::{LookupError, StoreError};
use crate::domain::message::{Keyboard, OutgoingMessage};
use crate::domain::train::TrainStatus;
use crate::domain::types::{ChatFlowState, ChatId, MessageId, Subscription};

/// Abstract interface for a Chat Provider (Telegram, or a recorder in tests)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a new message and return its id
    async fn send_message(&self, chat_id: ChatId, message: &OutgoingMessage) -> Result<MessageId>;

    /// Replace text and keyboard of an existing message
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<()>;

    /// Replace only the inline keyboard of an existing message
    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &Keyboard,
    ) -> Result<()>;

    /// Acknowledge an inline button press
    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> Result<()>;
}

/// Source of live train data
#[async_trait]
pub trait TrainStatusProvider: Send + Sync {
    async fn lookup(
        &self,
        train_number: &str,
        date: DateTime<FixedOffset>,
    ) -> Result<TrainStatus, LookupError>;
}

/// Persisted per-chat conversation state
pub trait FlowStore: Send + Sync {
    /// Read the chat's state, creating and persisting the initial one if absent
    fn load_or_init(&self, chat_id: ChatId) -> Result<ChatFlowState, StoreError>;

    /// Upsert
    fn save(&self, state: &ChatFlowState) -> Result<(), StoreError>;
}

/// Persisted mirror of the subscription registry
pub trait SubscriptionStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<Subscription>, StoreError>;

    fn insert(&self, subscription: &Subscription) -> Result<(), StoreError>;

    fn delete(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), StoreError>;

    fn delete_chat(&self, chat_id: ChatId) -> Result<(), StoreError>;

    /// Delete every record of the chat, then insert `items`
    fn replace_chat(&self, chat_id: ChatId, items: &[Subscription]) -> Result<(), StoreError>;
}
