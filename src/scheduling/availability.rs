// src/scheduling/availability.rs
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::info;

use super::{evaluate, BookingQuery, Scheduler};
use crate::db;
use crate::domain::availability::{AvailabilityRule, BlockPeriod, NewAvailabilityRule, NewBlockPeriod};
use crate::domain::time_window::{day_of_week, TimeWindow, MINUTES_PER_DAY};
use crate::errors::SchedulingError;

impl Scheduler {
    /// Declare a weekly window. Rules for the same salesperson, weekday,
    /// city and channel may touch but not overlap.
    pub fn create_rule(&self, rule: &NewAvailabilityRule) -> Result<AvailabilityRule, SchedulingError> {
        rule.validate()?;
        let now = self.now();

        let created = self.db.transaction(|tx| {
            let existing = db::availability::active_rules(tx, rule.salesperson_id)?;
            if let Some(clash) = existing.iter().find(|r| rule.overlaps(r)) {
                return Err(SchedulingError::RuleOverlap { rule_id: clash.id });
            }
            db::availability::insert_rule(tx, rule, now)
        })?;

        self.cache.invalidate(created.salesperson_id);
        info!(rule_id = created.id, salesperson_id = created.salesperson_id, "availability rule created");
        Ok(created)
    }

    pub fn deactivate_rule(&self, rule_id: i64) -> Result<AvailabilityRule, SchedulingError> {
        let rule = self.db.transaction(|tx| {
            db::availability::deactivate_rule(tx, rule_id)?;
            db::availability::get_rule(tx, rule_id)?
                .ok_or_else(|| SchedulingError::not_found("availability rule", rule_id))
        })?;

        self.cache.invalidate(rule.salesperson_id);
        info!(rule_id, "availability rule deactivated");
        Ok(rule)
    }

    pub fn list_rules(&self, salesperson_id: i64) -> Result<Vec<AvailabilityRule>, SchedulingError> {
        self.db
            .with_conn(|conn| db::availability::active_rules(conn, salesperson_id))
    }

    pub fn create_block(&self, block: &NewBlockPeriod) -> Result<BlockPeriod, SchedulingError> {
        block.validate()?;
        let now = self.now();

        let created = self
            .db
            .transaction(|tx| db::availability::insert_block(tx, block, now))?;

        self.cache.invalidate(created.salesperson_id);
        info!(
            block_id = created.id,
            salesperson_id = created.salesperson_id,
            from = %created.date_start,
            to = %created.date_end,
            "block period created"
        );
        Ok(created)
    }

    pub fn deactivate_block(&self, block_id: i64) -> Result<BlockPeriod, SchedulingError> {
        let block = self.db.transaction(|tx| {
            db::availability::deactivate_block(tx, block_id)?;
            db::availability::get_block(tx, block_id)?
                .ok_or_else(|| SchedulingError::not_found("block period", block_id))
        })?;

        self.cache.invalidate(block.salesperson_id);
        info!(block_id, "block period deactivated");
        Ok(block)
    }

    /// Every block on record for a salesperson, deactivated ones included.
    pub fn list_blocks(&self, salesperson_id: i64) -> Result<Vec<BlockPeriod>, SchedulingError> {
        self.db
            .with_conn(|conn| db::availability::all_blocks(conn, salesperson_id))
    }

    /// Bookable windows of `duration_minutes` on `date`, starting every
    /// `step_minutes` inside each matching rule. Without rules for that
    /// weekday the configured business hours are searched instead.
    pub fn free_slots(
        &self,
        salesperson_id: i64,
        date: NaiveDate,
        duration_minutes: i32,
        step_minutes: i32,
        city: Option<&str>,
        channel: Option<&str>,
    ) -> Result<Vec<TimeWindow>, SchedulingError> {
        let within_day = 1..=MINUTES_PER_DAY;
        if !within_day.contains(&duration_minutes) || !within_day.contains(&step_minutes) {
            return Err(SchedulingError::InvalidInput(format!(
                "duration and step must be between 1 and {MINUTES_PER_DAY} minutes, got {duration_minutes} and {step_minutes}"
            )));
        }
        let now = self.now();

        let (snapshot, meetings) = self.db.with_conn(|conn| {
            let snapshot = self.cache.get_or_load(salesperson_id, now, || {
                Ok((
                    db::availability::active_rules(conn, salesperson_id)?,
                    db::availability::active_blocks(conn, salesperson_id)?,
                ))
            })?;
            let meetings = db::meetings::active_meetings_on(conn, salesperson_id, date)?;
            Ok((snapshot, meetings))
        })?;

        let weekday = day_of_week(date);
        let mut spans: Vec<(i32, i32)> = snapshot
            .rules
            .iter()
            .filter(|r| r.active && r.day_of_week == weekday && r.applies_to(city, channel))
            .map(|r| (r.start_minute, r.end_minute))
            .collect();
        if spans.is_empty() {
            spans.push((self.policy.business_open, self.policy.business_close));
        }

        let mut starts = BTreeSet::new();
        for (open, close) in spans {
            let mut start = open;
            while start + duration_minutes <= close {
                let query = BookingQuery {
                    salesperson_id,
                    date,
                    start_minute: start,
                    end_minute: start + duration_minutes,
                    city: city.map(str::to_string),
                    channel: channel.map(str::to_string),
                    exclude_meeting_id: None,
                };
                if evaluate(
                    &query,
                    &snapshot.blocks,
                    &meetings,
                    &snapshot.rules,
                    self.policy.enforce_availability,
                )
                .valid
                {
                    starts.insert(start);
                }
                start += step_minutes;
            }
        }

        Ok(starts
            .into_iter()
            .map(|start| TimeWindow {
                date,
                start_minute: start,
                end_minute: start + duration_minutes,
            })
            .collect())
    }
}
