//! # Train Lookup
//!
//! One stateless lookup shared by the interactive flow, the inline-button callbacks
//! and the subscription poller. It resolves the group, renders the status message
//! and decides whether a subscription on it has reached its terminal condition.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::application::clock::ServiceClock;
use crate::application::keyboards::{self, SubscriptionButton};
use crate::domain::errors::LookupError;
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::TrainStatusProvider;
use crate::domain::train::{StatusState, Station, TrainGroup, TrainStatus};
use crate::domain::types::UNDETERMINED_GROUP;
use crate::strings::{messages, status};

/// How long after the scheduled arrival at the last station a journey is kept.
pub const ARRIVAL_GRACE_HOURS: i64 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub train_number: String,
    pub date: DateTime<FixedOffset>,
    pub group_index: i32,
}

impl LookupRequest {
    pub fn new(train_number: impl Into<String>, date: DateTime<FixedOffset>, group_index: i32) -> Self {
        Self {
            train_number: train_number.into(),
            date,
            group_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Status report of one group.
    Report,
    /// Multiple groups and none chosen yet.
    ChooseGroup,
    /// Train known, but without any group to report on.
    Unknown,
    NotFound,
    UpstreamFailure,
}

#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub kind: LookupKind,
    pub message: OutgoingMessage,
    pub should_unsubscribe: bool,
    /// Group the report was rendered for, after resolution.
    pub group_index: i32,
}

impl LookupOutcome {
    /// Whether the upstream knew the train (the message reflects live data).
    pub fn found(&self) -> bool {
        !matches!(self.kind, LookupKind::NotFound | LookupKind::UpstreamFailure)
    }
}

/// The next stop that has not been left yet.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStop<'a> {
    Arriving {
        station: &'a Station,
        at: DateTime<FixedOffset>,
        remaining: Duration,
    },
    Stopped {
        station: &'a Station,
        remaining: Duration,
    },
}

pub struct TrainLookup {
    provider: Arc<dyn TrainStatusProvider>,
    clock: ServiceClock,
    web_app_url: String,
}

impl TrainLookup {
    pub fn new(
        provider: Arc<dyn TrainStatusProvider>,
        clock: ServiceClock,
        web_app_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            clock,
            web_app_url: web_app_url.into(),
        }
    }

    pub fn clock(&self) -> &ServiceClock {
        &self.clock
    }

    pub fn web_app_url(&self) -> &str {
        &self.web_app_url
    }

    /// Only transport failures are returned as errors; NotFound and upstream
    /// failures are recovered into an outcome that still carries the date rule.
    pub async fn lookup(
        &self,
        request: &LookupRequest,
        is_subscribed: bool,
    ) -> Result<LookupOutcome, LookupError> {
        let now = self.clock.now();
        let train = match self.provider.lookup(&request.train_number, request.date).await {
            Ok(train) => train,
            Err(err @ LookupError::NotFound(_)) => {
                tracing::warn!("In handle train number: {}", err);
                return Ok(self.failure(request, LookupKind::NotFound, now));
            }
            Err(err @ LookupError::Upstream { .. }) => {
                tracing::error!("In handle train number: {}", err);
                return Ok(self.failure(request, LookupKind::UpstreamFailure, now));
            }
            Err(err) => {
                tracing::error!("In handle train number: {}", err);
                return Err(err);
            }
        };
        Ok(self.render(&train, request, is_subscribed, now))
    }

    fn failure(
        &self,
        request: &LookupRequest,
        kind: LookupKind,
        now: DateTime<Tz>,
    ) -> LookupOutcome {
        let text = match kind {
            LookupKind::NotFound => messages::train_not_found(&request.train_number),
            _ => messages::upstream_error(&request.train_number),
        };
        LookupOutcome {
            kind,
            message: OutgoingMessage::text(text),
            should_unsubscribe: is_before_yesterday(request.date, now),
            group_index: request.group_index,
        }
    }

    fn render(
        &self,
        train: &TrainStatus,
        request: &LookupRequest,
        is_subscribed: bool,
        now: DateTime<Tz>,
    ) -> LookupOutcome {
        let Some(group_index) = resolve_group(request.group_index, train.groups.len()) else {
            if train.groups.is_empty() {
                return self.unknown(train, request, now);
            }
            let keyboard = keyboards::group_picker(
                &request.train_number,
                request.date,
                &train.groups,
                &self.web_app_url,
            );
            return LookupOutcome {
                kind: LookupKind::ChooseGroup,
                message: OutgoingMessage::text(messages::choose_group(&train.rank, &train.number))
                    .with_keyboard(keyboard),
                should_unsubscribe: false,
                group_index: UNDETERMINED_GROUP,
            };
        };

        let group = &train.groups[group_index as usize];
        let should_unsubscribe = should_unsubscribe(group, request.date, now);
        let next = next_stop(group, now.fixed_offset());
        let text = status::status_report(train, group, next.as_ref(), self.clock.zone());

        let departure = group.first_departure().unwrap_or(request.date);
        let keyboard = keyboards::status_keyboard(
            &train.number,
            departure,
            group_index,
            SubscriptionButton::choose(should_unsubscribe, is_subscribed),
            &self.web_app_url,
        );

        LookupOutcome {
            kind: LookupKind::Report,
            message: OutgoingMessage::text(text).with_keyboard(keyboard),
            should_unsubscribe,
            group_index,
        }
    }

    fn unknown(
        &self,
        train: &TrainStatus,
        request: &LookupRequest,
        now: DateTime<Tz>,
    ) -> LookupOutcome {
        let keyboard = keyboards::status_keyboard(
            &train.number,
            request.date,
            request.group_index,
            SubscriptionButton::Neither,
            &self.web_app_url,
        );
        LookupOutcome {
            kind: LookupKind::Unknown,
            message: OutgoingMessage::text(messages::status_unknown(&train.rank, &train.number))
                .with_keyboard(keyboard),
            should_unsubscribe: is_before_yesterday(request.date, now),
            group_index: request.group_index,
        }
    }
}

/// Single-group trains always use group 0, out-of-range indices fall back to 0,
/// `None` means the user still has to pick one of several groups.
pub fn resolve_group(requested: i32, group_count: usize) -> Option<i32> {
    if group_count == 1 {
        return Some(0);
    }
    if group_count == 0 {
        return None;
    }
    if requested == UNDETERMINED_GROUP {
        return None;
    }
    if requested < 0 || requested as usize >= group_count {
        return Some(0);
    }
    Some(requested)
}

/// Terminal condition of a subscription on `group`, in priority order:
/// arrival at the last station is more than six hours past, the live status says
/// the train arrived at its last station, or the journey date is before yesterday.
pub fn should_unsubscribe<Z: TimeZone>(
    group: &TrainGroup,
    date: DateTime<FixedOffset>,
    now: DateTime<Z>,
) -> bool {
    if let Some(last) = group.last_station() {
        if let Some(arrival) = &last.arrival
            && now.fixed_offset() > arrival.schedule_time + Duration::hours(ARRIVAL_GRACE_HOURS)
        {
            return true;
        }
        if let Some(status) = &group.status
            && status.state == StatusState::Arrival
            && status.station == last.name
        {
            return true;
        }
    }
    is_before_yesterday(date, now)
}

/// `date` is before midnight at the start of yesterday, in the zone of `now`.
pub fn is_before_yesterday<Z: TimeZone>(date: DateTime<FixedOffset>, now: DateTime<Z>) -> bool {
    let Some(yesterday) = now.date_naive().pred_opt() else {
        return false;
    };
    match now
        .timezone()
        .from_local_datetime(&yesterday.and_time(NaiveTime::MIN))
        .earliest()
    {
        Some(midnight) => date < midnight.fixed_offset(),
        None => false,
    }
}

/// First stop whose (delayed) arrival or departure has not elapsed yet.
pub fn next_stop(group: &TrainGroup, now: DateTime<FixedOffset>) -> Option<NextStop<'_>> {
    let station = group.stations.iter().find(|station| {
        station.arrival.as_ref().is_some_and(|a| now < a.estimated())
            || station.departure.as_ref().is_some_and(|d| now < d.estimated())
    })?;

    if let Some(arrival) = &station.arrival {
        let at = arrival.estimated();
        if now < at {
            return Some(NextStop::Arriving {
                station,
                at,
                remaining: at - now,
            });
        }
    }
    let departure = station.departure.as_ref()?.estimated();
    Some(NextStop::Stopped {
        station,
        remaining: departure - now,
    })
}
