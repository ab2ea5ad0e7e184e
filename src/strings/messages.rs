//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! All dynamic values are HTML-escaped, messages are sent in HTML parse mode.

use teloxide::utils::html::escape;

pub const WAITING_FOR_TRAIN_NUMBER: &str =
    "Please send the number of the train you want information for.";
pub const PLEASE_WAIT: &str = "Please wait...";
pub const COMMAND_CANCELLED: &str = "Command cancelled.";
pub const CHOOSE_DATE: &str = concat!(
    "Please choose the date of departure from the first station for this train.\n",
    "\n",
    "You may also send the date as a message in the following formats: ",
    "dd.mm.yyyy, m/d/yyyy, yyyy-mm-dd, UNIX timestamp.\n",
    "\n",
    "Keep in mind that, for night trains, this date might be yesterday."
);
pub const TRAIN_NUMBER_TOO_LONG: &str =
    "This train number is too long. Please try again or use /cancel to cancel.";
pub const INVALID_DATE: &str = "Invalid date. Please try again or use /cancel to cancel.";
pub const SERVICE_UNREACHABLE: &str =
    "Could not reach the train information service. Please try again later.";
pub const FEATURE_UNAVAILABLE: &str = "This command is not available yet.";

pub const SUBSCRIBE_BUTTON: &str = "Subscribe to updates";
pub const UNSUBSCRIBE_BUTTON: &str = "Unsubscribe from updates";
pub const OPEN_IN_WEB_APP_BUTTON: &str = "Open in WebApp";

pub const SUBSCRIBED: &str = "You will receive live updates in this message.";
pub const ALREADY_SUBSCRIBED: &str = "This message is already receiving live updates.";
pub const UNSUBSCRIBED: &str = "Live updates stopped.";
pub const NOT_SUBSCRIBED: &str = "This message was not receiving live updates.";
pub const SUBSCRIPTION_FAILED: &str = "Could not change the subscription, please try again.";
pub const ALL_UNSUBSCRIBED: &str = "All live updates in this chat were stopped.";

pub fn train_not_found(train_number: &str) -> String {
    format!("The train {} was not found.", escape(train_number))
}

pub fn upstream_error(train_number: &str) -> String {
    format!(
        "Unknown server error when searching for train {}.",
        escape(train_number)
    )
}

pub fn choose_group(rank: &str, number: &str) -> String {
    format!(
        "Train <b>{} {}</b> contains multiple groups. Please choose one.",
        escape(rank),
        escape(number)
    )
}

pub fn status_unknown(rank: &str, number: &str) -> String {
    format!(
        "The status of the train <b>{} {}</b> is unknown.",
        escape(rank),
        escape(number)
    )
}

pub fn yesterday_button(date: &str) -> String {
    format!("Yesterday ({date})")
}

pub fn today_button(date: &str) -> String {
    format!("Today ({date})")
}

pub fn group_button(from: &str, to: &str) -> String {
    format!("{from} ➔ {to}")
}
