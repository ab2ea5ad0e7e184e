//! # Log Strings
//!
//! Recurring log lines, kept in one place like the user-facing strings.

pub const STARTING: &str = "Starting trainbot...";
pub const SHUTDOWN: &str = "Shutting down...";

pub fn subscriptions_loaded(count: usize) -> String {
    format!("Loaded {count} subscription(s) from storage")
}

pub fn cycle_finished(checked: usize, edited: usize, failed: usize, unsubscribed: usize) -> String {
    format!(
        "Subscription check finished: {checked} checked, {edited} updated, {failed} failed, {unsubscribed} unsubscribed"
    )
}
