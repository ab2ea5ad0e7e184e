//! # Inline Keyboards
//!
//! Button layouts for the date picker, group picker and status messages.

use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, TimeZone};
use chrono_tz::Tz;
use reqwest::Url;

use crate::application::callback::{CallbackAction, CallbackPayload};
use crate::domain::message::{Button, Keyboard};
use crate::domain::train::TrainGroup;
use crate::domain::types::UNDETERMINED_GROUP;
use crate::strings::messages;

/// Which subscription button a status message offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionButton {
    OfferSubscribe,
    OfferUnsubscribe,
    Neither,
}

impl SubscriptionButton {
    pub fn choose(should_unsubscribe: bool, is_subscribed: bool) -> Self {
        if should_unsubscribe {
            SubscriptionButton::Neither
        } else if is_subscribed {
            SubscriptionButton::OfferUnsubscribe
        } else {
            SubscriptionButton::OfferSubscribe
        }
    }
}

/// Yesterday and today, then three weeks ahead, seven days per row.
/// Days are calendar days in the zone of `now`.
pub fn date_picker(train_number: &str, now: DateTime<Tz>) -> Keyboard {
    let choose = |at: DateTime<Tz>| {
        CallbackPayload::new(CallbackAction::ChooseDate, train_number, at.fixed_offset(), None).encode()
    };

    let mut keyboard = Keyboard::default();
    let yesterday = shift_days(now, -1);
    keyboard.push_row(vec![
        Button::callback(
            messages::yesterday_button(&yesterday.format("%d.%m.%Y").to_string()),
            choose(yesterday),
        ),
        Button::callback(
            messages::today_button(&now.format("%d.%m.%Y").to_string()),
            choose(now),
        ),
    ]);
    for week in 0..3 {
        let row = (0..7)
            .map(|day| {
                let at = shift_days(now, week * 7 + day + 1);
                Button::callback(at.format("%d.%m").to_string(), choose(at))
            })
            .collect();
        keyboard.push_row(row);
    }
    keyboard
}

/// Same wall-clock time `days` calendar days away.
fn shift_days(now: DateTime<Tz>, days: i64) -> DateTime<Tz> {
    let local = now.naive_local() + Duration::days(days);
    now.timezone()
        .from_local_datetime(&local)
        .earliest()
        .unwrap_or(now + Duration::days(days))
}

/// One button per group, then the web app link.
pub fn group_picker(
    train_number: &str,
    date: DateTime<FixedOffset>,
    groups: &[TrainGroup],
    web_app_url: &str,
) -> Keyboard {
    let mut keyboard = Keyboard::default();
    for (index, group) in groups.iter().enumerate() {
        let payload =
            CallbackPayload::new(CallbackAction::ChooseGroup, train_number, date, Some(index as i32));
        keyboard.push_row(vec![Button::callback(
            messages::group_button(&group.route.from, &group.route.to),
            payload.encode(),
        )]);
    }
    let departure = groups.first().and_then(TrainGroup::first_departure).unwrap_or(date);
    push_web_app_row(&mut keyboard, web_app_url, train_number, departure, UNDETERMINED_GROUP);
    keyboard
}

pub fn status_keyboard(
    train_number: &str,
    date: DateTime<FixedOffset>,
    group_index: i32,
    button: SubscriptionButton,
    web_app_url: &str,
) -> Keyboard {
    let mut keyboard = Keyboard::default();
    let subscription = match button {
        SubscriptionButton::OfferSubscribe => {
            Some((messages::SUBSCRIBE_BUTTON, CallbackAction::Subscribe))
        }
        SubscriptionButton::OfferUnsubscribe => {
            Some((messages::UNSUBSCRIBE_BUTTON, CallbackAction::Unsubscribe))
        }
        SubscriptionButton::Neither => None,
    };
    if let Some((text, action)) = subscription {
        let payload = CallbackPayload::new(action, train_number, date, Some(group_index));
        keyboard.push_row(vec![Button::callback(text, payload.encode())]);
    }
    push_web_app_row(&mut keyboard, web_app_url, train_number, date, group_index);
    keyboard
}

fn push_web_app_row(
    keyboard: &mut Keyboard,
    base: &str,
    train_number: &str,
    date: DateTime<FixedOffset>,
    group_index: i32,
) {
    match web_app_link(base, train_number, date, group_index) {
        Some(url) => keyboard.push_row(vec![Button::url(messages::OPEN_IN_WEB_APP_BUTTON, url)]),
        None => tracing::warn!("Invalid web app url {:?}, skipping link button", base),
    }
}

pub fn web_app_link(
    base: &str,
    train_number: &str,
    date: DateTime<FixedOffset>,
    group_index: i32,
) -> Option<String> {
    let mut url = Url::parse(base).ok()?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("train", train_number);
        query.append_pair("date", &date.to_rfc3339_opts(SecondsFormat::Secs, true));
        if group_index != UNDETERMINED_GROUP {
            query.append_pair("groupIndex", &group_index.to_string());
        }
    }
    Some(url.to_string())
}
