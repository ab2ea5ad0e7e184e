//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (ChatProvider, TrainStatusProvider,
//! FlowStore, SubscriptionStore).

pub mod store;
pub mod telegram;
pub mod train_api;
