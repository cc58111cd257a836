// src/scheduling/holds.rs
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use super::Scheduler;
use crate::db;
use crate::domain::reservation::{hold_expiry, HoldStatus, NewHold, TemporaryReservation};
use crate::domain::time_window::SlotRange;
use crate::errors::SchedulingError;
use crate::notify::Notification;

/// What one `sweep_expired` run reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub promoted: usize,
}

impl Scheduler {
    /// Place a hold on `slot` of a resource. Fails with `ResourceContended`
    /// while another live hold overlaps it; lapsed holds do not count.
    pub fn create_hold(
        &self,
        resource_id: i64,
        slot: SlotRange,
        holder_id: i64,
        ttl_minutes: Option<i64>,
    ) -> Result<TemporaryReservation, SchedulingError> {
        let now = self.now();
        let expires_at = hold_expiry(now, ttl_minutes.unwrap_or(self.policy.hold_ttl_minutes))?;

        let hold = self.db.transaction(|tx| {
            let live = db::reservations::active_for_resource(tx, resource_id)?;
            if let Some(blocking) = live.iter().find(|h| h.contends_with(&slot, now)) {
                return Err(SchedulingError::ResourceContended {
                    resource_id,
                    reservation_id: blocking.id,
                });
            }
            db::reservations::insert_hold(
                tx,
                &NewHold {
                    resource_id,
                    slot,
                    holder_id,
                    created_at: now,
                    expires_at,
                },
            )
        })?;

        info!(
            reservation_id = hold.id,
            resource_id,
            holder_id,
            expires_at = hold.expires_at,
            "hold created"
        );
        Ok(hold)
    }

    /// Give a hold back. Terminal holds are returned unchanged. A hold that
    /// already lapsed is reconciled to `expired` here instead.
    /// Either way the freed slot goes to the waitlist.
    pub fn release_hold(&self, reservation_id: i64) -> Result<TemporaryReservation, SchedulingError> {
        let now = self.now();
        let (hold, notifications) = self.db.transaction(|tx| {
            let hold = db::reservations::require_hold(tx, reservation_id)?;
            let to = match hold.effective_status(now) {
                HoldStatus::Active => HoldStatus::Released,
                HoldStatus::Expired if hold.status == HoldStatus::Active => HoldStatus::Expired,
                _ => return Ok((hold, Vec::new())),
            };

            let mut notifications = Vec::new();
            if db::reservations::close_hold(tx, hold.id, to, None, now)? {
                if let Some(promoted) = self.promote_in(tx, hold.resource_id, &hold.slot, now)? {
                    notifications.push(promotion_notice(&promoted));
                }
            }
            Ok((db::reservations::require_hold(tx, reservation_id)?, notifications))
        })?;

        info!(reservation_id, status = %hold.status, "hold released");
        self.announce(&notifications);
        Ok(hold)
    }

    /// Mark a hold as consumed by a firm booking made by the caller.
    /// Converting twice with the same booking id is accepted.
    pub fn convert_hold(
        &self,
        reservation_id: i64,
        booking_id: i64,
    ) -> Result<TemporaryReservation, SchedulingError> {
        let now = self.now();
        let hold = self.db.transaction(|tx| {
            let hold = db::reservations::require_hold(tx, reservation_id)?;
            match hold.effective_status(now) {
                HoldStatus::Active => {
                    db::reservations::close_hold(
                        tx,
                        hold.id,
                        HoldStatus::Converted,
                        Some(booking_id),
                        now,
                    )?;
                    db::reservations::require_hold(tx, reservation_id)
                }
                HoldStatus::Expired => Err(SchedulingError::Expired { reservation_id }),
                HoldStatus::Converted if hold.booking_id == Some(booking_id) => Ok(hold),
                other => Err(SchedulingError::InvalidTransition {
                    entity: "reservation",
                    from: other.to_string(),
                    action: "convert",
                }),
            }
        })?;

        info!(reservation_id, booking_id, "hold converted");
        Ok(hold)
    }

    /// Move every lapsed hold to `expired` and promote the waitlist for each
    /// one. Each row transitions once, so repeated sweeps promote nothing new.
    pub fn sweep_expired(&self) -> Result<SweepReport, SchedulingError> {
        let now = self.now();
        let (report, notifications) = self.db.transaction(|tx| {
            let mut report = SweepReport::default();
            let mut notifications = Vec::new();

            for hold in db::reservations::lapsed(tx, now)? {
                if !db::reservations::close_hold(tx, hold.id, HoldStatus::Expired, None, now)? {
                    continue;
                }
                report.expired += 1;
                if let Some(promoted) = self.promote_in(tx, hold.resource_id, &hold.slot, now)? {
                    report.promoted += 1;
                    notifications.push(promotion_notice(&promoted));
                }
            }
            Ok((report, notifications))
        })?;

        if report.expired > 0 {
            info!(expired = report.expired, promoted = report.promoted, "expired holds swept");
        } else {
            debug!("sweep found nothing to expire");
        }
        self.announce(&notifications);
        Ok(report)
    }

    /// The hold with lazy expiry applied.
    pub fn get_hold(&self, reservation_id: i64) -> Result<TemporaryReservation, SchedulingError> {
        let now = self.now();
        self.db
            .with_conn(|conn| db::reservations::require_hold(conn, reservation_id))
            .map(|h| h.as_of(now))
    }

    /// All holds on a resource, newest first, with lazy expiry applied.
    pub fn list_holds(&self, resource_id: i64) -> Result<Vec<TemporaryReservation>, SchedulingError> {
        let now = self.now();
        let holds = self
            .db
            .with_conn(|conn| db::reservations::for_resource(conn, resource_id))?;
        Ok(holds.into_iter().map(|h| h.as_of(now)).collect())
    }

    /// Hand `freed` to the best waitlist entry that can actually take it.
    /// Entries whose slot is still covered by another live hold are skipped.
    /// Runs inside the caller's transaction.
    pub(super) fn promote_in(
        &self,
        conn: &Connection,
        resource_id: i64,
        freed: &SlotRange,
        now: i64,
    ) -> Result<Option<TemporaryReservation>, SchedulingError> {
        let expires_at = hold_expiry(now, self.policy.promotion_ttl_minutes)?;
        let entries = db::waitlist::for_resource(conn, resource_id)?;
        let live = db::reservations::active_for_resource(conn, resource_id)?;

        let Some(entry) = crate::domain::waitlist::candidates_for(&entries, freed)
            .into_iter()
            .find(|e| !live.iter().any(|h| h.contends_with(&e.slot, now)))
        else {
            return Ok(None);
        };

        db::waitlist::delete_entry(conn, entry.id)?;
        let hold = db::reservations::insert_hold(
            conn,
            &NewHold {
                resource_id,
                slot: entry.slot,
                holder_id: entry.requester_id,
                created_at: now,
                expires_at,
            },
        )?;

        info!(
            entry_id = entry.id,
            reservation_id = hold.id,
            holder_id = hold.holder_id,
            "waitlist entry promoted"
        );
        Ok(Some(hold))
    }
}

pub(super) fn promotion_notice(hold: &TemporaryReservation) -> Notification {
    Notification::HoldPromoted {
        reservation_id: hold.id,
        resource_id: hold.resource_id,
        holder_id: hold.holder_id,
        slot: hold.slot,
        expires_at: hold.expires_at,
    }
}
