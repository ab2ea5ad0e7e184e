//! # Help Text
//!
//! Greeting and command overview.
//! Displayed on `/start` and on free text when no command is in progress.

pub const TRAIN_INFO_COMMAND: &str = "/train_info";
pub const STATION_INFO_COMMAND: &str = "/station_info";
pub const ROUTE_COMMAND: &str = "/route";
pub const CANCEL_COMMAND: &str = "/cancel";
pub const START_COMMAND: &str = "/start";
pub const UNSUBSCRIBE_ALL_COMMAND: &str = "/unsubscribe_all";

pub const MAIN: &str = concat!(
    "Hello. 😄\n",
    "\n",
    "You can send the following commands:\n",
    "\n",
    "/train_info - Find information about a certain train.\n",
    "/station_info - Find departures or arrivals at a certain station.\n",
    "/route - Find trains for a certain route.\n",
    "/unsubscribe_all - Stop every live update in this chat.\n",
    "\n",
    "You may use /cancel to cancel any ongoing command."
);
