//! # Train Data
//!
//! Structured train status as served by the upstream scraper API.
//! Field names follow its camelCase JSON.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainStatus {
    pub rank: String,
    pub number: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub groups: Vec<TrainGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainGroup {
    pub route: Route,
    #[serde(default)]
    pub status: Option<GroupStatus>,
    #[serde(default)]
    pub stations: Vec<Station>,
}

impl TrainGroup {
    pub fn last_station(&self) -> Option<&Station> {
        self.stations.last()
    }

    pub fn first_departure(&self) -> Option<DateTime<FixedOffset>> {
        self.stations
            .first()
            .and_then(|s| s.departure.as_ref())
            .map(|d| d.schedule_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Arrival,
    Departure,
    Passing,
}

/// Latest live event reported for a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatus {
    /// Minutes; negative means early.
    pub delay: i64,
    pub station: String,
    pub state: StatusState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub name: String,
    #[serde(default)]
    pub link_name: String,
    #[serde(default)]
    pub km: i64,
    #[serde(default)]
    pub stopping_time: Option<i64>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub arrival: Option<StopTime>,
    #[serde(default)]
    pub departure: Option<StopTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTime {
    pub schedule_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub status: Option<StopTimeStatus>,
}

impl StopTime {
    /// Scheduled time shifted by the live delay, if any.
    pub fn estimated(&self) -> DateTime<FixedOffset> {
        let delay = self.status.as_ref().map_or(0, |s| s.delay);
        self.schedule_time + Duration::minutes(delay)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeStatus {
    pub delay: i64,
    #[serde(default)]
    pub real: bool,
    #[serde(default)]
    pub cancelled: bool,
}
