// src/domain/time_window.rs

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::SchedulingError;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// A half-open `[start_minute, end_minute)` interval on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start_minute: i32,
    pub end_minute: i32,
}

impl TimeWindow {
    pub fn new(date: NaiveDate, start_minute: i32, end_minute: i32) -> Result<Self, SchedulingError> {
        check_minutes(start_minute, end_minute)?;
        Ok(Self {
            date,
            start_minute,
            end_minute,
        })
    }

    /// Build from "HH:MM" strings.
    pub fn parse(date: NaiveDate, start: &str, end: &str) -> Result<Self, SchedulingError> {
        Self::new(date, parse_time(start)?, parse_time(end)?)
    }

    pub fn duration_minutes(&self) -> i32 {
        self.end_minute - self.start_minute
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        overlaps(self, other)
    }

    /// True when `inner` lies entirely inside `self`.
    pub fn contains(&self, inner: &TimeWindow) -> bool {
        self.date == inner.date
            && self.start_minute <= inner.start_minute
            && inner.end_minute <= self.end_minute
    }

    /// 0 = Sunday .. 6 = Saturday.
    pub fn day_of_week(&self) -> u8 {
        day_of_week(self.date)
    }
}

/// Half-open overlap test on minute ranges. Ranges that only touch at an
/// endpoint do not overlap.
pub fn ranges_overlap(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn overlaps(a: &TimeWindow, b: &TimeWindow) -> bool {
    a.date == b.date && ranges_overlap(a.start_minute, a.end_minute, b.start_minute, b.end_minute)
}

pub fn duration_minutes(w: &TimeWindow) -> i32 {
    w.duration_minutes()
}

/// "HH:MM" -> minutes since midnight. "24:00" is accepted as an end-of-day bound.
pub fn parse_time(s: &str) -> Result<i32, SchedulingError> {
    let bad = || SchedulingError::InvalidWindow(format!("expected HH:MM, got {s:?}"));

    let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
        return Err(bad());
    }
    let hours: i32 = h.parse().map_err(|_| bad())?;
    let minutes: i32 = m.parse().map_err(|_| bad())?;

    if hours == 24 && minutes == 0 {
        return Ok(MINUTES_PER_DAY);
    }
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(bad());
    }
    Ok(hours * 60 + minutes)
}

pub fn format_time(minute: i32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn check_minutes(start_minute: i32, end_minute: i32) -> Result<(), SchedulingError> {
    if start_minute < 0 || end_minute > MINUTES_PER_DAY {
        return Err(SchedulingError::InvalidWindow(format!(
            "minutes must lie within 0..={MINUTES_PER_DAY}, got {start_minute}..{end_minute}"
        )));
    }
    if start_minute >= end_minute {
        return Err(SchedulingError::InvalidWindow(format!(
            "start {} must be before end {}",
            format_time(start_minute),
            format_time(end_minute)
        )));
    }
    Ok(())
}

/// The same daily window repeated over an inclusive range of dates. This is
/// what a venue hold or a waitlist entry claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRange {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub start_minute: i32,
    pub end_minute: i32,
}

impl SlotRange {
    pub fn new(
        date_start: NaiveDate,
        date_end: NaiveDate,
        start_minute: i32,
        end_minute: i32,
    ) -> Result<Self, SchedulingError> {
        if date_start > date_end {
            return Err(SchedulingError::InvalidWindow(format!(
                "date range {date_start}..{date_end} is reversed"
            )));
        }
        check_minutes(start_minute, end_minute)?;
        Ok(Self {
            date_start,
            date_end,
            start_minute,
            end_minute,
        })
    }

    pub fn single_day(window: TimeWindow) -> Self {
        Self {
            date_start: window.date,
            date_end: window.date,
            start_minute: window.start_minute,
            end_minute: window.end_minute,
        }
    }

    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    /// Dates intersect (inclusive) and the daily windows overlap (half-open).
    pub fn overlaps(&self, other: &SlotRange) -> bool {
        self.date_start <= other.date_end
            && other.date_start <= self.date_end
            && ranges_overlap(
                self.start_minute,
                self.end_minute,
                other.start_minute,
                other.end_minute,
            )
    }

    pub fn window_on(&self, date: NaiveDate) -> Option<TimeWindow> {
        self.covers_date(date).then_some(TimeWindow {
            date,
            start_minute: self.start_minute,
            end_minute: self.end_minute,
        })
    }
}
