// src/scheduling/meetings.rs
use chrono::NaiveDate;
use tracing::info;

use super::{BookingQuery, Scheduler};
use crate::db;
use crate::domain::meeting::{ConfirmingParty, Meeting, MeetingOutcome, MeetingRequest};
use crate::domain::time_window::TimeWindow;
use crate::errors::SchedulingError;
use crate::notify::Notification;

impl Scheduler {
    /// Book a new meeting in `scheduled`. The conflict check and the insert
    /// share one write transaction.
    pub fn schedule_meeting(&self, req: &MeetingRequest) -> Result<Meeting, SchedulingError> {
        let now = self.now();
        let query = BookingQuery {
            salesperson_id: req.salesperson_id,
            date: req.window.date,
            start_minute: req.window.start_minute,
            end_minute: req.window.end_minute,
            city: req.city.clone(),
            channel: req.channel.clone(),
            exclude_meeting_id: None,
        };

        let meeting = self.db.transaction(|tx| {
            self.check_booking(tx, &query)?.into_result()?;
            db::meetings::insert_meeting(tx, req, now)
        })?;

        info!(
            meeting_id = meeting.id,
            salesperson_id = meeting.salesperson_id,
            date = %meeting.window.date,
            "meeting scheduled"
        );
        self.announce(&[Notification::MeetingScheduled {
            meeting_id: meeting.id,
            salesperson_id: meeting.salesperson_id,
            client_id: meeting.client_id,
            window: meeting.window,
        }]);
        Ok(meeting)
    }

    pub fn confirm_meeting(
        &self,
        meeting_id: i64,
        party: ConfirmingParty,
    ) -> Result<Meeting, SchedulingError> {
        let now = self.now();
        let meeting = self.db.transaction(|tx| {
            let mut meeting = db::meetings::require_meeting(tx, meeting_id)?;
            meeting.confirm(party)?;
            db::meetings::update_meeting(tx, &meeting, now)?;
            Ok(meeting)
        })?;

        info!(meeting_id, ?party, "meeting confirmed");
        Ok(meeting)
    }

    /// Move a meeting to a new slot. The new slot goes through the same
    /// validation as a fresh booking, ignoring only the meeting itself.
    pub fn reschedule_meeting(
        &self,
        meeting_id: i64,
        date: NaiveDate,
        start_minute: i32,
        end_minute: i32,
    ) -> Result<Meeting, SchedulingError> {
        let now = self.now();
        let (meeting, previous) = self.db.transaction(|tx| {
            let mut meeting = db::meetings::require_meeting(tx, meeting_id)?;
            meeting.ensure_reschedulable()?;

            let query = BookingQuery {
                salesperson_id: meeting.salesperson_id,
                date,
                start_minute,
                end_minute,
                city: meeting.city.clone(),
                channel: meeting.channel.clone(),
                exclude_meeting_id: Some(meeting.id),
            };
            self.check_booking(tx, &query)?.into_result()?;

            let previous = meeting.window;
            meeting.reschedule(TimeWindow::new(date, start_minute, end_minute)?)?;
            db::meetings::update_meeting(tx, &meeting, now)?;
            Ok((meeting, previous))
        })?;

        info!(meeting_id, from = %previous.date, to = %meeting.window.date, "meeting rescheduled");
        self.announce(&[Notification::MeetingRescheduled {
            meeting_id: meeting.id,
            salesperson_id: meeting.salesperson_id,
            client_id: meeting.client_id,
            previous,
            window: meeting.window,
        }]);
        Ok(meeting)
    }

    /// Cancelling frees the slot immediately.
    pub fn cancel_meeting(&self, meeting_id: i64) -> Result<Meeting, SchedulingError> {
        let now = self.now();
        let meeting = self.db.transaction(|tx| {
            let mut meeting = db::meetings::require_meeting(tx, meeting_id)?;
            meeting.cancel()?;
            db::meetings::update_meeting(tx, &meeting, now)?;
            Ok(meeting)
        })?;

        info!(meeting_id, "meeting cancelled");
        self.announce(&[Notification::MeetingCancelled {
            meeting_id: meeting.id,
            salesperson_id: meeting.salesperson_id,
            client_id: meeting.client_id,
        }]);
        Ok(meeting)
    }

    pub fn complete_meeting(
        &self,
        meeting_id: i64,
        outcome: MeetingOutcome,
        notes: Option<String>,
    ) -> Result<Meeting, SchedulingError> {
        let now = self.now();
        let meeting = self.db.transaction(|tx| {
            let mut meeting = db::meetings::require_meeting(tx, meeting_id)?;
            meeting.complete(outcome, notes)?;
            db::meetings::update_meeting(tx, &meeting, now)?;
            Ok(meeting)
        })?;

        info!(meeting_id, outcome = outcome.as_str(), "meeting completed");
        Ok(meeting)
    }

    pub fn get_meeting(&self, meeting_id: i64) -> Result<Meeting, SchedulingError> {
        self.db
            .with_conn(|conn| db::meetings::require_meeting(conn, meeting_id))
    }

    /// Every meeting a salesperson has on `date`, cancelled ones included.
    pub fn agenda(&self, salesperson_id: i64, date: NaiveDate) -> Result<Vec<Meeting>, SchedulingError> {
        self.db
            .with_conn(|conn| db::meetings::meetings_on(conn, salesperson_id, date))
    }
}
