//! # trainbot
//!
//! Telegram bot reporting live train status, with in-place updating subscriptions.
//! - Domain: Configuration, Types, Traits
//! - Infrastructure: Telegram, Train API, JSON store
//! - Application: Flow, Lookup, Registry, Poller, Router, Logging
//! - Interface: Command Handlers

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod strings;

#[cfg(test)]
pub mod testing;
