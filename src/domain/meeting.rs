// src/domain/meeting.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::time_window::TimeWindow;
use crate::errors::SchedulingError;

/// Lifecycle of a firm booking:
///
/// ```text
/// scheduled ──confirm──> confirmed
///     │                     │
///     └──reschedule──> rescheduled ──confirm──> confirmed
///
/// any active state ──cancel──> cancelled
/// any active state ──complete──> completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Scheduled,
    Confirmed,
    Rescheduled,
    Cancelled,
    Completed,
}

impl MeetingStatus {
    pub const ACTIVE: [MeetingStatus; 3] = [
        MeetingStatus::Scheduled,
        MeetingStatus::Confirmed,
        MeetingStatus::Rescheduled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Confirmed => "confirmed",
            MeetingStatus::Rescheduled => "rescheduled",
            MeetingStatus::Cancelled => "cancelled",
            MeetingStatus::Completed => "completed",
        }
    }

    /// Active meetings occupy the salesperson's calendar.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MeetingStatus::Cancelled | MeetingStatus::Completed)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MeetingStatus::Scheduled),
            "confirmed" => Ok(MeetingStatus::Confirmed),
            "rescheduled" => Ok(MeetingStatus::Rescheduled),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            "completed" => Ok(MeetingStatus::Completed),
            other => Err(SchedulingError::InvalidInput(format!(
                "unknown meeting status {other:?}"
            ))),
        }
    }
}

/// What came out of a meeting; feeds sales reporting downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingOutcome {
    Converted,
    NoInterest,
    FollowUp,
    NoShow,
}

impl MeetingOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            MeetingOutcome::Converted => "converted",
            MeetingOutcome::NoInterest => "no_interest",
            MeetingOutcome::FollowUp => "follow_up",
            MeetingOutcome::NoShow => "no_show",
        }
    }
}

impl FromStr for MeetingOutcome {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "converted" => Ok(MeetingOutcome::Converted),
            "no_interest" => Ok(MeetingOutcome::NoInterest),
            "follow_up" => Ok(MeetingOutcome::FollowUp),
            "no_show" => Ok(MeetingOutcome::NoShow),
            other => Err(SchedulingError::InvalidInput(format!(
                "unknown meeting outcome {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmingParty {
    Client,
    Salesperson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: i64,
    pub salesperson_id: i64,
    pub client_id: i64,
    pub window: TimeWindow,
    pub status: MeetingStatus,
    pub confirmed_by_client: bool,
    pub confirmed_by_salesperson: bool,
    pub city: Option<String>,
    pub channel: Option<String>,
    pub outcome: Option<MeetingOutcome>,
    pub outcome_notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Meeting {
    pub fn is_mutually_confirmed(&self) -> bool {
        self.confirmed_by_client && self.confirmed_by_salesperson
    }

    fn reject(&self, action: &'static str) -> SchedulingError {
        SchedulingError::InvalidTransition {
            entity: "meeting",
            from: self.status.to_string(),
            action,
        }
    }

    /// Record one party's confirmation. The first confirmation moves the
    /// meeting to `confirmed`; the flags are tracked independently.
    pub fn confirm(&mut self, party: ConfirmingParty) -> Result<(), SchedulingError> {
        if self.status.is_terminal() {
            return Err(self.reject("confirm"));
        }
        match party {
            ConfirmingParty::Client => self.confirmed_by_client = true,
            ConfirmingParty::Salesperson => self.confirmed_by_salesperson = true,
        }
        self.status = MeetingStatus::Confirmed;
        Ok(())
    }

    /// Move to a new window. The caller must already have validated it.
    /// Both confirmations are cleared since they applied to the old time.
    pub fn reschedule(&mut self, window: TimeWindow) -> Result<(), SchedulingError> {
        self.ensure_reschedulable()?;
        self.window = window;
        self.status = MeetingStatus::Rescheduled;
        self.confirmed_by_client = false;
        self.confirmed_by_salesperson = false;
        Ok(())
    }

    pub fn ensure_reschedulable(&self) -> Result<(), SchedulingError> {
        if self.status.is_terminal() {
            return Err(self.reject("reschedule"));
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), SchedulingError> {
        if self.status.is_terminal() {
            return Err(self.reject("cancel"));
        }
        self.status = MeetingStatus::Cancelled;
        Ok(())
    }

    pub fn complete(
        &mut self,
        outcome: MeetingOutcome,
        notes: Option<String>,
    ) -> Result<(), SchedulingError> {
        if self.status.is_terminal() {
            return Err(self.reject("complete"));
        }
        self.status = MeetingStatus::Completed;
        self.outcome = Some(outcome);
        self.outcome_notes = notes;
        Ok(())
    }
}

/// Booking request for a new meeting.
#[derive(Debug, Clone)]
pub struct MeetingRequest {
    pub salesperson_id: i64,
    pub client_id: i64,
    pub window: TimeWindow,
    pub city: Option<String>,
    pub channel: Option<String>,
}
