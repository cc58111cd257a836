// src/scheduling/mod.rs
//! Meeting scheduling with conflict detection, and venue holds with
//! waitlist promotion.
//!
//! Every operation is a short synchronous unit of work against the store.
//! Anything that checks for conflicts and then writes does both inside one
//! `Database::transaction`, which holds the SQLite write lock for its whole
//! duration; two bookings for the same salesperson or resource can never
//! both pass the check.

mod availability;
mod cache;
mod conflicts;
mod holds;
mod meetings;
mod waitlist;

pub use cache::RuleCache;
pub use conflicts::{evaluate, BookingCheck, BookingQuery, ConflictReason};
pub use holds::SweepReport;

use std::sync::Arc;

use crate::clock::Clock;
use crate::db::Database;
use crate::notify::{self, Notification, Notifier};

/// Deployment knobs for the scheduling core.
#[derive(Debug, Clone)]
pub struct SchedulingPolicy {
    /// Require meetings to fall inside a declared availability rule when
    /// the salesperson has rules for that weekday.
    pub enforce_availability: bool,
    pub hold_ttl_minutes: i64,
    /// TTL of holds created by waitlist promotion.
    pub promotion_ttl_minutes: i64,
    /// 0 disables the rule/block cache.
    pub rule_cache_ttl_secs: i64,
    /// Fallback day used by free-slot search when a salesperson has no rules.
    pub business_open: i32,
    pub business_close: i32,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            enforce_availability: false,
            hold_ttl_minutes: 60,
            promotion_ttl_minutes: 60,
            rule_cache_ttl_secs: 60,
            business_open: 8 * 60,
            business_close: 18 * 60,
        }
    }
}

/// Entry point for every scheduling operation.
pub struct Scheduler {
    db: Database,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    cache: RuleCache,
    policy: SchedulingPolicy,
}

impl Scheduler {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        policy: SchedulingPolicy,
    ) -> Self {
        let cache = RuleCache::new(policy.rule_cache_ttl_secs);
        Self {
            db,
            clock,
            notifier,
            cache,
            policy,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    fn now(&self) -> i64 {
        self.clock.now_unix()
    }

    /// Called only after the originating transaction committed.
    fn announce(&self, notifications: &[Notification]) {
        notify::dispatch(self.notifier.as_ref(), notifications);
    }
}
