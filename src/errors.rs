// errors.rs
use serde::Serialize;
use thiserror::Error;

/// Message raised by the `meetings` overlap triggers in `sql/schema.sql`.
pub const MEETING_CONFLICT_TRIGGER: &str = "MEETING_CONFLICT";

/// Kind of record a rejection points at, so the caller can show the operator
/// exactly what is in the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Meeting,
    BlockPeriod,
    AvailabilityRule,
    Reservation,
    WaitlistEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

/// Errors produced by the scheduling core and the store underneath it.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("invalid time window: {0}")]
    InvalidWindow(String),

    #[error("salesperson is unavailable during block period {block_id}")]
    BlockedPeriod { block_id: i64 },

    #[error(
        "window overlaps an active meeting{}",
        .meeting_id.map(|id| format!(" ({id})")).unwrap_or_default()
    )]
    MeetingConflict { meeting_id: Option<i64> },

    #[error("window is outside the salesperson's declared availability")]
    OutsideAvailability,

    #[error("resource {resource_id} is held by reservation {reservation_id}")]
    ResourceContended {
        resource_id: i64,
        reservation_id: i64,
    },

    #[error("reservation {reservation_id} has expired")]
    Expired { reservation_id: i64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("cannot {action} a {entity} in status {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: &'static str,
    },

    #[error("availability rule overlaps rule {rule_id}")]
    RuleOverlap { rule_id: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SchedulingError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        SchedulingError::NotFound { entity, id }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulingError::InvalidWindow(_) => "INVALID_WINDOW",
            SchedulingError::BlockedPeriod { .. } => "BLOCKED_PERIOD",
            SchedulingError::MeetingConflict { .. } => "MEETING_CONFLICT",
            SchedulingError::OutsideAvailability => "OUTSIDE_AVAILABILITY",
            SchedulingError::ResourceContended { .. } => "RESOURCE_CONTENDED",
            SchedulingError::Expired { .. } => "EXPIRED",
            SchedulingError::NotFound { .. } => "NOT_FOUND",
            SchedulingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            SchedulingError::RuleOverlap { .. } => "RULE_OVERLAP",
            SchedulingError::InvalidInput(_) => "INVALID_INPUT",
            SchedulingError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            SchedulingError::InvalidWindow(_) | SchedulingError::InvalidInput(_) => 400,
            SchedulingError::NotFound { .. } => 404,
            SchedulingError::Expired { .. } => 410,
            SchedulingError::StoreUnavailable(_) => 503,
            SchedulingError::BlockedPeriod { .. }
            | SchedulingError::MeetingConflict { .. }
            | SchedulingError::OutsideAvailability
            | SchedulingError::ResourceContended { .. }
            | SchedulingError::InvalidTransition { .. }
            | SchedulingError::RuleOverlap { .. } => 409,
        }
    }

    /// Only infrastructure failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::StoreUnavailable(_))
    }

    /// The record that caused a business-rule rejection, if there is one.
    pub fn conflicting_entity(&self) -> Option<EntityRef> {
        match self {
            SchedulingError::BlockedPeriod { block_id } => {
                Some(EntityRef::new(EntityKind::BlockPeriod, *block_id))
            }
            SchedulingError::MeetingConflict {
                meeting_id: Some(id),
            } => Some(EntityRef::new(EntityKind::Meeting, *id)),
            SchedulingError::ResourceContended { reservation_id, .. }
            | SchedulingError::Expired { reservation_id } => {
                Some(EntityRef::new(EntityKind::Reservation, *reservation_id))
            }
            SchedulingError::RuleOverlap { rule_id } => {
                Some(EntityRef::new(EntityKind::AvailabilityRule, *rule_id))
            }
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg == MEETING_CONFLICT_TRIGGER => {
                SchedulingError::MeetingConflict { meeting_id: None }
            }
            _ => SchedulingError::StoreUnavailable(e.to_string()),
        }
    }
}

/// Errors originating from either the server logic
/// (routing, request decoding) or the scheduling core.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error("Internal Server Error")]
    InternalError,
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::NotFound => 404,
            ServerError::BadRequest(_) => 400,
            ServerError::Scheduling(e) => e.http_status(),
            ServerError::InternalError => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServerError::NotFound => "NOT_FOUND",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Scheduling(e) => e.code(),
            ServerError::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("invalid JSON body: {e}"))
    }
}
