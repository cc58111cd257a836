// src/scheduling/cache.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::domain::availability::{AvailabilityRule, BlockPeriod};
use crate::errors::SchedulingError;

/// Rules and active blocks for one salesperson, as of `loaded_at`.
#[derive(Debug, Clone)]
pub struct AvailabilitySnapshot {
    pub rules: Arc<Vec<AvailabilityRule>>,
    pub blocks: Arc<Vec<BlockPeriod>>,
    loaded_at: i64,
}

/// Short-lived cache over the read-mostly availability data. Every rule or
/// block write goes through `Scheduler`, which invalidates the affected
/// salesperson after committing.
#[derive(Debug)]
pub struct RuleCache {
    ttl_secs: i64,
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<i64, AvailabilitySnapshot>,
    /// Bumped by every invalidation. A load that straddles a bump is not stored.
    generations: HashMap<i64, u64>,
}

impl CacheState {
    fn generation(&self, salesperson_id: i64) -> u64 {
        self.generations.get(&salesperson_id).copied().unwrap_or(0)
    }
}

impl RuleCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Cached snapshot, or `load()` when missing or older than the TTL.
    pub fn get_or_load<F>(
        &self,
        salesperson_id: i64,
        now: i64,
        load: F,
    ) -> Result<AvailabilitySnapshot, SchedulingError>
    where
        F: FnOnce() -> Result<(Vec<AvailabilityRule>, Vec<BlockPeriod>), SchedulingError>,
    {
        let generation = {
            let state = self.lock();
            if self.ttl_secs > 0 {
                if let Some(snap) = state.entries.get(&salesperson_id) {
                    if now - snap.loaded_at < self.ttl_secs {
                        return Ok(snap.clone());
                    }
                }
            }
            state.generation(salesperson_id)
        };

        let (rules, blocks) = load()?;
        let snap = AvailabilitySnapshot {
            rules: Arc::new(rules),
            blocks: Arc::new(blocks),
            loaded_at: now,
        };
        if self.ttl_secs > 0 {
            let mut state = self.lock();
            if state.generation(salesperson_id) == generation {
                debug!(salesperson_id, "availability cache refreshed");
                state.entries.insert(salesperson_id, snap.clone());
            } else {
                debug!(salesperson_id, "availability changed during load, not cached");
            }
        }
        Ok(snap)
    }

    pub fn invalidate(&self, salesperson_id: i64) {
        let mut state = self.lock();
        state.entries.remove(&salesperson_id);
        *state.generations.entry(salesperson_id).or_insert(0) += 1;
    }
}
