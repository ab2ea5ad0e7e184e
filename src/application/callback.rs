//! # Callback Payloads
//!
//! Inline buttons carry their whole context: `<tag>ESC<train>ESC<unix seconds>[ESC<group>]`.
//! Handling a button press therefore never depends on the stored flow state.

use chrono::{DateTime, FixedOffset, TimeZone};
use std::fmt;

use crate::domain::errors::CallbackError;

pub const SEPARATOR: char = '\x1b';

/// Telegram rejects callback data longer than this.
pub const MAX_DATA_BYTES: usize = 64;

/// Longest train number that still fits any payload into `MAX_DATA_BYTES`.
pub const MAX_TRAIN_NUMBER_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    ChooseDate,
    ChooseGroup,
    Subscribe,
    Unsubscribe,
}

impl CallbackAction {
    pub fn tag(self) -> &'static str {
        match self {
            CallbackAction::ChooseDate => "TI_CHOOSE_DATE",
            CallbackAction::ChooseGroup => "TI_CHOOSE_GROUP",
            CallbackAction::Subscribe => "TI_SUB",
            CallbackAction::Unsubscribe => "TI_UNSUB",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "TI_CHOOSE_DATE" => Some(CallbackAction::ChooseDate),
            "TI_CHOOSE_GROUP" => Some(CallbackAction::ChooseGroup),
            "TI_SUB" => Some(CallbackAction::Subscribe),
            "TI_UNSUB" => Some(CallbackAction::Unsubscribe),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub action: CallbackAction,
    pub train_number: String,
    pub timestamp: i64,
    pub group_index: Option<i32>,
}

impl CallbackPayload {
    pub fn new(
        action: CallbackAction,
        train_number: impl Into<String>,
        date: DateTime<FixedOffset>,
        group_index: Option<i32>,
    ) -> Self {
        Self {
            action,
            train_number: train_number.into(),
            timestamp: date.timestamp(),
            group_index,
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(data: &str) -> Result<Self, CallbackError> {
        if data.is_empty() {
            return Err(CallbackError::Empty);
        }
        let parts: Vec<&str> = data.split(SEPARATOR).collect();
        let action =
            CallbackAction::from_tag(parts[0]).ok_or_else(|| CallbackError::UnknownAction(parts[0].to_string()))?;
        let malformed = || CallbackError::Malformed(data.to_string());

        if !(3..=4).contains(&parts.len()) || parts[1].is_empty() {
            return Err(malformed());
        }
        let timestamp = parts[2].parse().map_err(|_| malformed())?;
        let group_index = match parts.get(3) {
            Some(raw) => Some(raw.parse().map_err(|_| malformed())?),
            None => None,
        };

        Ok(Self {
            action,
            train_number: parts[1].to_string(),
            timestamp,
            group_index,
        })
    }

    /// The encoded instant, expressed in `zone`.
    pub fn date<Z: TimeZone>(&self, zone: &Z) -> Result<DateTime<FixedOffset>, CallbackError> {
        zone.timestamp_opt(self.timestamp, 0)
            .single()
            .map(|at| at.fixed_offset())
            .ok_or_else(|| CallbackError::Malformed(self.encode()))
    }
}

impl fmt::Display for CallbackPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.action.tag(),
            self.train_number,
            self.timestamp
        )?;
        if let Some(group) = self.group_index {
            write!(f, "{SEPARATOR}{group}")?;
        }
        Ok(())
    }
}
