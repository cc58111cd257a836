// src/scheduling/conflicts.rs
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use super::Scheduler;
use crate::db;
use crate::domain::availability::{AvailabilityRule, BlockPeriod};
use crate::domain::meeting::Meeting;
use crate::domain::time_window::{day_of_week, ranges_overlap, TimeWindow};
use crate::errors::{EntityKind, EntityRef, SchedulingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictReason {
    InvalidWindow,
    BlockedPeriod,
    MeetingConflict,
    OutsideAvailability,
}

/// A proposed slot for a salesperson.
#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    pub salesperson_id: i64,
    pub date: NaiveDate,
    pub start_minute: i32,
    pub end_minute: i32,
    pub city: Option<String>,
    pub channel: Option<String>,
    /// The meeting being moved, so it does not conflict with itself.
    pub exclude_meeting_id: Option<i64>,
}

impl BookingQuery {
    pub fn for_window(salesperson_id: i64, window: &TimeWindow) -> Self {
        Self {
            salesperson_id,
            date: window.date,
            start_minute: window.start_minute,
            end_minute: window.end_minute,
            ..Default::default()
        }
    }

    fn window(&self) -> TimeWindow {
        TimeWindow {
            date: self.date,
            start_minute: self.start_minute,
            end_minute: self.end_minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConflictReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_entity: Option<EntityRef>,
}

impl BookingCheck {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
            conflicting_entity: None,
        }
    }

    fn rejected(reason: ConflictReason, entity: Option<EntityRef>) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            conflicting_entity: entity,
        }
    }

    /// The matching `SchedulingError` for a rejection.
    pub fn into_result(self) -> Result<(), SchedulingError> {
        let id = self.conflicting_entity.map(|e| e.id);
        match self.reason {
            None => Ok(()),
            Some(ConflictReason::InvalidWindow) => Err(SchedulingError::InvalidWindow(
                "start must be before end".into(),
            )),
            Some(ConflictReason::BlockedPeriod) => Err(SchedulingError::BlockedPeriod {
                block_id: id.unwrap_or_default(),
            }),
            Some(ConflictReason::MeetingConflict) => {
                Err(SchedulingError::MeetingConflict { meeting_id: id })
            }
            Some(ConflictReason::OutsideAvailability) => Err(SchedulingError::OutsideAvailability),
        }
    }
}

/// Decide whether `query` is bookable given everything that could stand in
/// its way. Checks run in a fixed order: malformed window, blackout periods,
/// existing meetings, then (when `enforce_availability`) declared weekly
/// availability. Inactive rows and the excluded meeting are ignored.
pub fn evaluate(
    query: &BookingQuery,
    blocks: &[BlockPeriod],
    meetings: &[Meeting],
    rules: &[AvailabilityRule],
    enforce_availability: bool,
) -> BookingCheck {
    if query.start_minute >= query.end_minute {
        return BookingCheck::rejected(ConflictReason::InvalidWindow, None);
    }
    let window = query.window();

    if let Some(block) = blocks
        .iter()
        .find(|b| b.salesperson_id == query.salesperson_id && b.blocks(&window))
    {
        return BookingCheck::rejected(
            ConflictReason::BlockedPeriod,
            Some(EntityRef::new(EntityKind::BlockPeriod, block.id)),
        );
    }

    if let Some(meeting) = meetings.iter().find(|m| {
        m.salesperson_id == query.salesperson_id
            && m.status.is_active()
            && Some(m.id) != query.exclude_meeting_id
            && m.window.overlaps(&window)
    }) {
        return BookingCheck::rejected(
            ConflictReason::MeetingConflict,
            Some(EntityRef::new(EntityKind::Meeting, meeting.id)),
        );
    }

    if enforce_availability {
        let weekday = day_of_week(query.date);
        let todays: Vec<&AvailabilityRule> = rules
            .iter()
            .filter(|r| r.active && r.salesperson_id == query.salesperson_id && r.day_of_week == weekday)
            .collect();

        // No rules for the day means no restriction.
        if !todays.is_empty()
            && !todays.iter().any(|r| {
                r.applies_to(query.city.as_deref(), query.channel.as_deref()) && r.covers(&window)
            })
        {
            return BookingCheck::rejected(ConflictReason::OutsideAvailability, None);
        }
    }

    BookingCheck::ok()
}

impl Scheduler {
    /// Load what `evaluate` needs through `conn` and decide. Meetings are
    /// always read fresh; rules and blocks may come from the cache.
    pub(super) fn check_booking(
        &self,
        conn: &Connection,
        query: &BookingQuery,
    ) -> Result<BookingCheck, SchedulingError> {
        if query.start_minute >= query.end_minute {
            return Ok(BookingCheck::rejected(ConflictReason::InvalidWindow, None));
        }

        let snapshot = self.cache.get_or_load(query.salesperson_id, self.now(), || {
            Ok((
                db::availability::active_rules(conn, query.salesperson_id)?,
                db::availability::active_blocks(conn, query.salesperson_id)?,
            ))
        })?;

        let meetings: Vec<Meeting> =
            db::meetings::active_meetings_on(conn, query.salesperson_id, query.date)?
                .into_iter()
                .filter(|m| {
                    ranges_overlap(
                        m.window.start_minute,
                        m.window.end_minute,
                        query.start_minute,
                        query.end_minute,
                    )
                })
                .collect();

        let check = evaluate(
            query,
            &snapshot.blocks,
            &meetings,
            &snapshot.rules,
            self.policy.enforce_availability,
        );
        if !check.valid {
            debug!(
                salesperson_id = query.salesperson_id,
                date = %query.date,
                reason = ?check.reason,
                "booking rejected"
            );
        }
        Ok(check)
    }

    /// Read-only legality check for a proposed slot. Nothing is written;
    /// callers that go on to book must use `schedule_meeting`, which
    /// repeats this check under the write lock.
    pub fn validate_booking(&self, query: &BookingQuery) -> Result<BookingCheck, SchedulingError> {
        self.db.with_conn(|conn| self.check_booking(conn, query))
    }
}
