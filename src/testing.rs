//! Test fixtures: fake train provider, recording chat provider and sample trains.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::clock::ServiceClock;
use crate::domain::errors::LookupError;
use crate::domain::message::{Keyboard, OutgoingMessage};
use crate::domain::traits::{ChatProvider, TrainStatusProvider};
use crate::domain::train::{
    GroupStatus, Route, Station, StatusState, StopTime, StopTimeStatus, TrainGroup, TrainStatus,
};
use crate::domain::types::{ChatId, MessageId, Subscription};

pub fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

/// A clock frozen at `rfc3339`, in the Romanian service timezone.
pub fn clock_at(rfc3339: &str) -> ServiceClock {
    ServiceClock::frozen(chrono_tz::Europe::Bucharest, at(rfc3339))
}

pub fn subscription(chat_id: ChatId, message_id: MessageId) -> Subscription {
    Subscription {
        chat_id,
        message_id,
        train_number: "1538".to_string(),
        date: at("2024-03-15T07:10:00+02:00"),
        group_index: 0,
    }
}

fn stop(name: &str, arrival: Option<(&str, Option<i64>)>, departure: Option<(&str, Option<i64>)>) -> Station {
    let time = |(schedule, delay): (&str, Option<i64>)| StopTime {
        schedule_time: at(schedule),
        status: delay.map(|delay| StopTimeStatus {
            delay,
            real: true,
            cancelled: false,
        }),
    };
    Station {
        name: name.to_string(),
        link_name: name.to_lowercase(),
        km: 0,
        stopping_time: None,
        platform: None,
        arrival: arrival.map(time),
        departure: departure.map(time),
    }
}

/// IR 1538 Cluj Napoca 07:10 -> Sighișoara 10:00 -> Brașov 13:00, running 12 min late.
pub fn one_group_train() -> TrainStatus {
    TrainStatus {
        rank: "IR".to_string(),
        number: "1538".to_string(),
        date: "15.03.2024".to_string(),
        operator: "CFR Călători".to_string(),
        groups: vec![TrainGroup {
            route: Route {
                from: "Cluj Napoca".to_string(),
                to: "Brașov".to_string(),
            },
            status: Some(GroupStatus {
                delay: 12,
                station: "Sighișoara".to_string(),
                state: StatusState::Departure,
            }),
            stations: vec![
                stop("Cluj Napoca", None, Some(("2024-03-15T07:10:00+02:00", Some(2)))),
                stop(
                    "Sighișoara",
                    Some(("2024-03-15T10:00:00+02:00", Some(12))),
                    Some(("2024-03-15T10:02:00+02:00", Some(12))),
                ),
                stop("Brașov", Some(("2024-03-15T13:00:00+02:00", None)), None),
            ],
        }],
    }
}

/// The same journey on 15.07.2024, under summer time (+03:00).
pub fn summer_train() -> TrainStatus {
    let mut train = one_group_train();
    train.date = "15.07.2024".to_string();
    let to_summer = |time: &mut StopTime| {
        let local = time.schedule_time.naive_local().to_string();
        time.schedule_time = at(&format!("{}+03:00", local.replace("2024-03-15 ", "2024-07-15T")));
    };
    for station in &mut train.groups[0].stations {
        if let Some(arrival) = station.arrival.as_mut() {
            to_summer(arrival);
        }
        if let Some(departure) = station.departure.as_mut() {
            to_summer(departure);
        }
    }
    train
}

/// The train above plus a second group continuing Brașov -> Sibiu.
pub fn two_group_train() -> TrainStatus {
    let mut train = one_group_train();
    train.groups.push(TrainGroup {
        route: Route {
            from: "Brașov".to_string(),
            to: "Sibiu".to_string(),
        },
        status: None,
        stations: vec![
            stop("Brașov", None, Some(("2024-03-15T13:30:00+02:00", None))),
            stop("Sibiu", Some(("2024-03-15T16:00:00+02:00", None)), None),
        ],
    });
    train
}

#[derive(Default)]
pub struct FakeTrainProvider {
    responses: HashMap<String, Result<TrainStatus, LookupError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeTrainProvider {
    pub fn with_train(mut self, number: &str, train: TrainStatus) -> Self {
        self.responses.insert(number.to_string(), Ok(train));
        self
    }

    pub fn with_error(mut self, number: &str, error: LookupError) -> Self {
        self.responses.insert(number.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrainStatusProvider for FakeTrainProvider {
    async fn lookup(
        &self,
        train_number: &str,
        _date: DateTime<FixedOffset>,
    ) -> Result<TrainStatus, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .get(train_number)
            .cloned()
            .unwrap_or_else(|| Err(LookupError::NotFound(train_number.to_string())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Sent {
        chat_id: ChatId,
        message_id: MessageId,
        message: OutgoingMessage,
    },
    Edited {
        chat_id: ChatId,
        message_id: MessageId,
        message: OutgoingMessage,
    },
    KeyboardEdited {
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Keyboard,
    },
    Answered {
        query_id: String,
        text: Option<String>,
    },
}

pub struct RecordingChat {
    events: Mutex<Vec<ChatEvent>>,
    next_id: AtomicI32,
    refused_sends: AtomicUsize,
}

impl Default for RecordingChat {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            refused_sends: AtomicUsize::new(0),
        }
    }
}

impl RecordingChat {
    /// Refuses the first `count` sends; edits and answers always succeed.
    pub fn refusing_sends(count: usize) -> Self {
        Self {
            refused_sends: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: ChatEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl ChatProvider for RecordingChat {
    async fn send_message(&self, chat_id: ChatId, message: &OutgoingMessage) -> Result<MessageId> {
        let refused = self
            .refused_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(anyhow!("send refused"));
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(ChatEvent::Sent {
            chat_id,
            message_id,
            message: message.clone(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<()> {
        self.record(ChatEvent::Edited {
            chat_id,
            message_id,
            message: message.clone(),
        });
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &Keyboard,
    ) -> Result<()> {
        self.record(ChatEvent::KeyboardEdited {
            chat_id,
            message_id,
            keyboard: keyboard.clone(),
        });
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> Result<()> {
        self.record(ChatEvent::Answered {
            query_id: query_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}
