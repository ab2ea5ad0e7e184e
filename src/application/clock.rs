//! # Service Clock
//!
//! "Now" in the service timezone. Frozen clocks make the terminal-condition and
//! date logic deterministic under test.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy)]
pub struct ServiceClock {
    zone: Tz,
    frozen: Option<DateTime<Utc>>,
}

impl ServiceClock {
    pub fn new(zone: Tz) -> Self {
        Self { zone, frozen: None }
    }

    /// A clock that always reports the instant `at`, seen from `zone`.
    pub fn frozen(zone: Tz, at: DateTime<FixedOffset>) -> Self {
        Self {
            zone,
            frozen: Some(at.with_timezone(&Utc)),
        }
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.frozen
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.zone)
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }
}
