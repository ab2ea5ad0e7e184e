//! # Command Handlers
//!
//! Contains specific handler functions for each supported command and button
//! (e.g., /train_info, /unsubscribe_all, the subscribe button).
//! These handlers are invoked by the Router.

pub mod help;
pub mod subscription;
pub mod train_info;
