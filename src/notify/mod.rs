// src/notify/mod.rs
//! Fire-and-forget notifications about booking changes. Delivery failures
//! are logged and never undo the operation that produced them.

mod brevo;

pub use brevo::BrevoNotifier;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::time_window::{format_time, SlotRange, TimeWindow};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("API error: {0}")]
    ApiError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    MeetingScheduled {
        meeting_id: i64,
        salesperson_id: i64,
        client_id: i64,
        window: TimeWindow,
    },
    MeetingRescheduled {
        meeting_id: i64,
        salesperson_id: i64,
        client_id: i64,
        previous: TimeWindow,
        window: TimeWindow,
    },
    MeetingCancelled {
        meeting_id: i64,
        salesperson_id: i64,
        client_id: i64,
    },
    HoldPromoted {
        reservation_id: i64,
        resource_id: i64,
        holder_id: i64,
        slot: SlotRange,
        expires_at: i64,
    },
}

impl Notification {
    pub fn subject(&self) -> String {
        match self {
            Notification::MeetingScheduled { meeting_id, .. } => {
                format!("Reunião #{meeting_id} agendada")
            }
            Notification::MeetingRescheduled { meeting_id, .. } => {
                format!("Reunião #{meeting_id} reagendada")
            }
            Notification::MeetingCancelled { meeting_id, .. } => {
                format!("Reunião #{meeting_id} cancelada")
            }
            Notification::HoldPromoted { resource_id, .. } => {
                format!("Espaço #{resource_id} reservado para você")
            }
        }
    }

    pub fn summary(&self) -> String {
        fn when(w: &TimeWindow) -> String {
            format!(
                "{} {}-{}",
                w.date,
                format_time(w.start_minute),
                format_time(w.end_minute)
            )
        }

        match self {
            Notification::MeetingScheduled { window, .. } => format!("Horário: {}", when(window)),
            Notification::MeetingRescheduled {
                previous, window, ..
            } => format!("De {} para {}", when(previous), when(window)),
            Notification::MeetingCancelled { .. } => "A reunião foi cancelada.".to_string(),
            Notification::HoldPromoted {
                slot, expires_at, ..
            } => format!(
                "Período {} a {}, {}-{}. Confirme antes de {}.",
                slot.date_start,
                slot.date_end,
                format_time(slot.start_minute),
                format_time(slot.end_minute),
                chrono::DateTime::from_timestamp(*expires_at, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| expires_at.to_string())
            ),
        }
    }
}

/// Delivery sink. Implementations may block; callers never wait on the
/// outcome beyond logging it.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Hand every notification to `notifier`, logging failures.
pub fn dispatch(notifier: &dyn Notifier, notifications: &[Notification]) {
    for n in notifications {
        if let Err(e) = notifier.notify(n) {
            warn!(error = %e, subject = %n.subject(), "notification delivery failed");
        }
    }
}

/// Writes notifications to the log. Default when no e-mail is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;
        info!(subject = %notification.subject(), %payload, "notification");
        Ok(())
    }
}

#[cfg(test)]
pub use recording::RecordingNotifier;
