//! # Application Layer
//!
//! Contains the core logic and orchestration of the bot.
//! This includes the conversation flow, the shared train lookup, the subscription
//! registry and poller, and update routing.

pub mod callback;
pub mod clock;
pub mod dates;
pub mod flow;
pub mod keyboards;
pub mod logging;
pub mod lookup;
pub mod poller;
pub mod registry;
pub mod router;
