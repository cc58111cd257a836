// src/domain/availability.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::time_window::{format_time, ranges_overlap, TimeWindow, MINUTES_PER_DAY};
use crate::errors::SchedulingError;

/// Recurring weekly window in which a salesperson takes meetings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRule {
    pub id: i64,
    pub salesperson_id: i64,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start_minute: i32,
    pub end_minute: i32,
    pub city: Option<String>,
    pub channel: Option<String>,
    pub active: bool,
}

impl AvailabilityRule {
    /// Whether this rule applies to a request for `city`/`channel`.
    /// An unset field on either side matches anything.
    pub fn applies_to(&self, city: Option<&str>, channel: Option<&str>) -> bool {
        field_matches(self.city.as_deref(), city) && field_matches(self.channel.as_deref(), channel)
    }

    /// Same (city, channel) pair, compared exactly. Used for the
    /// no-overlap check at creation.
    pub fn same_scope(&self, city: Option<&str>, channel: Option<&str>) -> bool {
        normalize(self.city.as_deref()) == normalize(city)
            && normalize(self.channel.as_deref()) == normalize(channel)
    }

    pub fn covers(&self, window: &TimeWindow) -> bool {
        self.start_minute <= window.start_minute && window.end_minute <= self.end_minute
    }

    pub fn window_on(&self, date: NaiveDate) -> TimeWindow {
        TimeWindow {
            date,
            start_minute: self.start_minute,
            end_minute: self.end_minute,
        }
    }
}

fn normalize(v: Option<&str>) -> Option<String> {
    v.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

fn field_matches(rule: Option<&str>, requested: Option<&str>) -> bool {
    match (normalize(rule), normalize(requested)) {
        (Some(r), Some(q)) => r == q,
        _ => true,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAvailabilityRule {
    pub salesperson_id: i64,
    pub day_of_week: u8,
    pub start_minute: i32,
    pub end_minute: i32,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl NewAvailabilityRule {
    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.day_of_week > 6 {
            return Err(SchedulingError::InvalidInput(format!(
                "day_of_week must be 0-6, got {}",
                self.day_of_week
            )));
        }
        check_bounds(self.start_minute, self.end_minute)
    }

    pub fn overlaps(&self, rule: &AvailabilityRule) -> bool {
        rule.active
            && rule.salesperson_id == self.salesperson_id
            && rule.day_of_week == self.day_of_week
            && rule.same_scope(self.city.as_deref(), self.channel.as_deref())
            && ranges_overlap(
                self.start_minute,
                self.end_minute,
                rule.start_minute,
                rule.end_minute,
            )
    }
}

/// Ad-hoc blackout ("bloqueio"). Without time bounds it blocks whole days.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPeriod {
    pub id: i64,
    pub salesperson_id: i64,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub time_start: Option<i32>,
    pub time_end: Option<i32>,
    pub reason: Option<String>,
    pub active: bool,
}

impl BlockPeriod {
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    pub fn is_whole_day(&self) -> bool {
        self.time_start.is_none() || self.time_end.is_none()
    }

    /// Whether this block makes `window` unavailable.
    pub fn blocks(&self, window: &TimeWindow) -> bool {
        if !self.active || !self.covers_date(window.date) {
            return false;
        }
        match (self.time_start, self.time_end) {
            (Some(start), Some(end)) => {
                ranges_overlap(start, end, window.start_minute, window.end_minute)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlockPeriod {
    pub salesperson_id: i64,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    #[serde(default)]
    pub time_start: Option<i32>,
    #[serde(default)]
    pub time_end: Option<i32>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewBlockPeriod {
    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.date_start > self.date_end {
            return Err(SchedulingError::InvalidWindow(format!(
                "block ends ({}) before it starts ({})",
                self.date_end, self.date_start
            )));
        }
        match (self.time_start, self.time_end) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) => check_bounds(start, end),
            _ => Err(SchedulingError::InvalidWindow(
                "block needs both time bounds or neither".into(),
            )),
        }
    }
}

fn check_bounds(start: i32, end: i32) -> Result<(), SchedulingError> {
    if start < 0 || end > MINUTES_PER_DAY || start >= end {
        return Err(SchedulingError::InvalidWindow(format!(
            "{}-{} is not a valid time range",
            format_time(start.max(0)),
            format_time(end.max(0))
        )));
    }
    Ok(())
}
