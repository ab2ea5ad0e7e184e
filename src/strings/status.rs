//! # Status Report
//!
//! Text of a live train status message.

use chrono::Duration;
use chrono_tz::Tz;
use teloxide::utils::html::escape;

use crate::application::lookup::NextStop;
use crate::domain::train::{GroupStatus, StatusState, TrainGroup, TrainStatus};

pub fn status_report(
    train: &TrainStatus,
    group: &TrainGroup,
    next_stop: Option<&NextStop<'_>>,
    zone: Tz,
) -> String {
    let mut text = format!(
        "Train <b>{} {}</b>\n{} ➔ {}\n\n",
        escape(&train.rank),
        escape(&train.number),
        escape(&group.route.from),
        escape(&group.route.to)
    );
    text.push_str(&format!("Date: {}\n", escape(&train.date)));
    text.push_str(&format!("Operator: {}\n", escape(&train.operator)));

    match next_stop {
        Some(NextStop::Arriving {
            station,
            at,
            remaining,
        }) => {
            text.push_str(&format!(
                "Next stop: {}{}, arriving in {} at {}\n",
                escape(&station.name),
                platform_suffix(station.platform.as_deref()),
                format_remaining(*remaining),
                at.with_timezone(&zone).format("%H:%M")
            ));
        }
        Some(NextStop::Stopped { station, remaining }) => {
            text.push_str(&format!(
                "Currently stopped at: {}{}, departing in {}\n",
                escape(&station.name),
                platform_suffix(station.platform.as_deref()),
                format_remaining(*remaining)
            ));
        }
        None => {}
    }

    if let Some(status) = &group.status {
        text.push_str(&status_line(status));
        text.push('\n');
    }
    text
}

fn platform_suffix(platform: Option<&str>) -> String {
    platform
        .map(|p| format!(" (platform {})", escape(p)))
        .unwrap_or_default()
}

pub fn status_line(status: &GroupStatus) -> String {
    let delay = match status.delay {
        0 => "on time".to_string(),
        d if d < 0 => format!("{} min early", -d),
        d => format!("{d} min late"),
    };
    let verb = match status.state {
        StatusState::Arrival => "arriving at",
        StatusState::Departure => "departing from",
        StatusState::Passing => "passing through",
    };
    format!("Status: {delay} when {verb} {}", escape(&status.station))
}

/// `1h5m`, `12m` or `less than 1m`.
pub fn format_remaining(remaining: Duration) -> String {
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    if hours >= 1 {
        format!("{hours}h{minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m")
    } else {
        "less than 1m".to_string()
    }
}
