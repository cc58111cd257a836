// src/scheduling/waitlist.rs
use tracing::info;

use super::holds::promotion_notice;
use super::Scheduler;
use crate::db;
use crate::domain::reservation::TemporaryReservation;
use crate::domain::time_window::SlotRange;
use crate::domain::waitlist::{self, ScoringPolicy, WaitlistCandidate, WaitlistEntry};
use crate::errors::SchedulingError;

impl Scheduler {
    /// Queue a requester for a slot with an externally computed score.
    pub fn enqueue_waitlist(
        &self,
        resource_id: i64,
        slot: SlotRange,
        requester_id: i64,
        score: f64,
    ) -> Result<WaitlistEntry, SchedulingError> {
        if !score.is_finite() {
            return Err(SchedulingError::InvalidInput(format!(
                "waitlist score must be a finite number, got {score}"
            )));
        }
        let enqueued_at_ms = self.clock.now_millis();

        let entry = self.db.transaction(|tx| {
            db::waitlist::insert_entry(tx, resource_id, &slot, requester_id, score, enqueued_at_ms)
        })?;

        info!(entry_id = entry.id, resource_id, requester_id, score, "waitlist entry added");
        Ok(entry)
    }

    /// Like `enqueue_waitlist`, scoring the candidate with `policy` first.
    pub fn enqueue_scored(
        &self,
        resource_id: i64,
        slot: SlotRange,
        candidate: &WaitlistCandidate,
        policy: &dyn ScoringPolicy,
    ) -> Result<WaitlistEntry, SchedulingError> {
        let score = policy.score(candidate, self.now());
        self.enqueue_waitlist(resource_id, slot, candidate.requester_id, score)
    }

    /// Offer `freed` to the waitlist right away, outside of any release or
    /// expiry. No-op when nobody is waiting for an overlapping slot.
    pub fn promote_next(
        &self,
        resource_id: i64,
        freed: SlotRange,
    ) -> Result<Option<TemporaryReservation>, SchedulingError> {
        let now = self.now();
        let promoted = self
            .db
            .transaction(|tx| self.promote_in(tx, resource_id, &freed, now))?;

        if let Some(hold) = &promoted {
            self.announce(&[promotion_notice(hold)]);
        }
        Ok(promoted)
    }

    /// 1-based rank among entries waiting for the same resource and slot.
    pub fn waitlist_position(&self, entry_id: i64) -> Result<usize, SchedulingError> {
        self.db.with_conn(|conn| {
            let entry = db::waitlist::get_entry(conn, entry_id)?
                .ok_or_else(|| SchedulingError::not_found("waitlist entry", entry_id))?;
            let peers = db::waitlist::for_resource(conn, entry.resource_id)?;
            waitlist::position_of(&peers, entry_id)
                .ok_or_else(|| SchedulingError::not_found("waitlist entry", entry_id))
        })
    }

    pub fn withdraw_waitlist(&self, entry_id: i64) -> Result<(), SchedulingError> {
        let removed = self
            .db
            .transaction(|tx| db::waitlist::delete_entry(tx, entry_id))?;
        if !removed {
            return Err(SchedulingError::not_found("waitlist entry", entry_id));
        }
        info!(entry_id, "waitlist entry withdrawn");
        Ok(())
    }

    /// Everyone waiting on a resource, best first.
    pub fn list_waitlist(&self, resource_id: i64) -> Result<Vec<WaitlistEntry>, SchedulingError> {
        let entries = self
            .db
            .with_conn(|conn| db::waitlist::for_resource(conn, resource_id))?;
        Ok(waitlist::ranked(&entries).into_iter().cloned().collect())
    }
}
