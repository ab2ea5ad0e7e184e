//! # Date Parsing
//!
//! Turns user text into a calendar date at noon in the service timezone.
//! Accepted: `yyyy-mm-dd`, `m/d/yyyy`, `dd.mm.yyyy` (year optional for the last two,
//! 2-digit years are in the current century) and bare UNIX timestamps in seconds.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone};

use crate::domain::errors::DateParseError;

/// Position of year, month and day within a 3-part date.
struct PartOrder {
    year: usize,
    month: usize,
    day: usize,
}

const ISO: PartOrder = PartOrder { year: 0, month: 1, day: 2 };
const US: PartOrder = PartOrder { year: 2, month: 0, day: 1 };
const EUROPEAN: PartOrder = PartOrder { year: 2, month: 1, day: 0 };

/// `now` supplies the timezone and the defaults for a missing year or century.
pub fn parse_date<Z: TimeZone>(
    input: &str,
    now: &DateTime<Z>,
) -> Result<DateTime<FixedOffset>, DateParseError> {
    let input = input.trim();
    if input.contains('-') {
        parse_three_parts(input, '-', ISO, now)
    } else if input.contains('/') {
        parse_three_parts(input, '/', US, now)
    } else if input.contains('.') {
        parse_three_parts(input, '.', EUROPEAN, now)
    } else {
        let seconds: i64 = input
            .parse()
            .map_err(|_| DateParseError(input.to_string()))?;
        now.timezone()
            .timestamp_opt(seconds, 0)
            .single()
            .map(|at| at.fixed_offset())
            .ok_or_else(|| DateParseError(input.to_string()))
    }
}

fn parse_three_parts<Z: TimeZone>(
    input: &str,
    separator: char,
    order: PartOrder,
    now: &DateTime<Z>,
) -> Result<DateTime<FixedOffset>, DateParseError> {
    let invalid = || DateParseError(input.to_string());

    let mut parts: Vec<String> = input.split(separator).map(|p| p.trim().to_string()).collect();
    if parts.len() == 2 && order.year == 2 {
        parts.push(now.year().to_string());
    }
    if parts.len() != 3 {
        return Err(invalid());
    }

    let mut year: i32 = parts[order.year].parse().map_err(|_| invalid())?;
    if (0..100).contains(&year) {
        year += now.year() / 100 * 100;
    }
    let month: u32 = parts[order.month].parse().map_err(|_| invalid())?;
    let day: u32 = parts[order.day].parse().map_err(|_| invalid())?;

    let noon = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .ok_or_else(invalid)?;
    now.timezone()
        .from_local_datetime(&noon)
        .single()
        .map(|at| at.fixed_offset())
        .ok_or_else(invalid)
}
