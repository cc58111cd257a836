// src/domain/reservation.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::time_window::SlotRange;
use crate::errors::SchedulingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    Active,
    Expired,
    Converted,
    Released,
}

impl HoldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HoldStatus::Active => "active",
            HoldStatus::Expired => "expired",
            HoldStatus::Converted => "converted",
            HoldStatus::Released => "released",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != HoldStatus::Active
    }
}

impl fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HoldStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(HoldStatus::Active),
            "expired" => Ok(HoldStatus::Expired),
            "converted" => Ok(HoldStatus::Converted),
            "released" => Ok(HoldStatus::Released),
            other => Err(SchedulingError::InvalidInput(format!(
                "unknown reservation status {other:?}"
            ))),
        }
    }
}

/// Time-boxed claim ("reserva temporária") on a venue or space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryReservation {
    pub id: i64,
    pub resource_id: i64,
    pub slot: SlotRange,
    pub holder_id: i64,
    pub status: HoldStatus,
    /// Unix seconds.
    pub created_at: i64,
    pub expires_at: i64,
    pub booking_id: Option<i64>,
    pub closed_at: Option<i64>,
}

impl TemporaryReservation {
    /// Still `active` in storage but past its expiry.
    pub fn is_lapsed(&self, now: i64) -> bool {
        self.status == HoldStatus::Active && now > self.expires_at
    }

    /// The status to act on, with lazy expiry applied.
    pub fn effective_status(&self, now: i64) -> HoldStatus {
        if self.is_lapsed(now) {
            HoldStatus::Expired
        } else {
            self.status
        }
    }

    /// This reservation as any reader at `now` should see it.
    pub fn as_of(mut self, now: i64) -> Self {
        self.status = self.effective_status(now);
        self
    }

    /// Whether this reservation keeps `slot` from being held by someone else.
    pub fn contends_with(&self, slot: &SlotRange, now: i64) -> bool {
        self.status == HoldStatus::Active && self.expires_at > now && self.slot.overlaps(slot)
    }

    pub fn remaining_secs(&self, now: i64) -> i64 {
        match self.effective_status(now) {
            HoldStatus::Active => (self.expires_at - now).max(0),
            _ => 0,
        }
    }
}

/// Longest hold anyone may place, in minutes (30 days).
pub const MAX_HOLD_TTL_MINUTES: i64 = 30 * 24 * 60;

/// Expiry in unix seconds for a hold placed at `now` lasting `ttl_minutes`.
pub fn hold_expiry(now: i64, ttl_minutes: i64) -> Result<i64, SchedulingError> {
    if !(1..=MAX_HOLD_TTL_MINUTES).contains(&ttl_minutes) {
        return Err(SchedulingError::InvalidInput(format!(
            "hold TTL must be between 1 and {MAX_HOLD_TTL_MINUTES} minutes, got {ttl_minutes}"
        )));
    }
    ttl_minutes
        .checked_mul(60)
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| SchedulingError::InvalidInput(format!("hold expiry out of range at {now}")))
}

#[derive(Debug, Clone)]
pub struct NewHold {
    pub resource_id: i64,
    pub slot: SlotRange,
    pub holder_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}
