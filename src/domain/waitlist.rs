// src/domain/waitlist.rs

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::time_window::SlotRange;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub id: i64,
    pub resource_id: i64,
    pub slot: SlotRange,
    pub requester_id: i64,
    pub score: f64,
    /// Unix milliseconds.
    pub enqueued_at_ms: i64,
}

/// Higher score first, then earlier enqueue. Equal timestamps fall back
/// to the id so the order is total.
pub fn rank_order(a: &WaitlistEntry, b: &WaitlistEntry) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.enqueued_at_ms.cmp(&b.enqueued_at_ms))
        .then(a.id.cmp(&b.id))
}

pub fn ranked(entries: &[WaitlistEntry]) -> Vec<&WaitlistEntry> {
    let mut out: Vec<&WaitlistEntry> = entries.iter().collect();
    out.sort_by(|a, b| rank_order(a, b));
    out
}

/// Entries whose slot overlaps the freed one, best first.
pub fn candidates_for<'a>(entries: &'a [WaitlistEntry], freed: &SlotRange) -> Vec<&'a WaitlistEntry> {
    let mut out: Vec<&WaitlistEntry> = entries.iter().filter(|e| e.slot.overlaps(freed)).collect();
    out.sort_by(|a, b| rank_order(a, b));
    out
}

pub fn pick_next<'a>(entries: &'a [WaitlistEntry], freed: &SlotRange) -> Option<&'a WaitlistEntry> {
    candidates_for(entries, freed).into_iter().next()
}

/// 1-based rank of `entry_id` among the entries queued for the same slot.
pub fn position_of(entries: &[WaitlistEntry], entry_id: i64) -> Option<usize> {
    let target = entries.iter().find(|e| e.id == entry_id)?;
    let peers: Vec<WaitlistEntry> = entries
        .iter()
        .filter(|e| e.resource_id == target.resource_id && e.slot == target.slot)
        .cloned()
        .collect();
    ranked(&peers)
        .iter()
        .position(|e| e.id == entry_id)
        .map(|i| i + 1)
}

/// Inputs a scoring policy may look at. Everything is optional because
/// the CRM rarely has all of it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistCandidate {
    pub requester_id: i64,
    #[serde(default)]
    pub customer_tier: Option<String>,
    #[serde(default)]
    pub lead_source: Option<String>,
    /// Unix seconds of the first contact with this lead.
    #[serde(default)]
    pub first_contact_at: Option<i64>,
}

/// Turns a candidate into a waitlist score. Ranking never looks inside.
pub trait ScoringPolicy: Send + Sync {
    fn score(&self, candidate: &WaitlistCandidate, now: i64) -> f64;
}

/// Stock policy: tier weight + lead-source weight + points per hour waited.
#[derive(Debug, Clone)]
pub struct LeadScoring {
    pub tier_weights: HashMap<String, f64>,
    pub source_weights: HashMap<String, f64>,
    pub per_hour_waited: f64,
}

impl Default for LeadScoring {
    fn default() -> Self {
        let tier_weights = [("gold", 30.0), ("silver", 20.0), ("bronze", 10.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let source_weights = [("indicacao", 15.0), ("site", 8.0), ("instagram", 5.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            tier_weights,
            source_weights,
            per_hour_waited: 0.5,
        }
    }
}

impl ScoringPolicy for LeadScoring {
    fn score(&self, candidate: &WaitlistCandidate, now: i64) -> f64 {
        let weight = |table: &HashMap<String, f64>, key: &Option<String>| {
            key.as_deref()
                .map(|k| k.trim().to_lowercase())
                .and_then(|k| table.get(&k).copied())
                .unwrap_or(0.0)
        };
        let waited_hours = candidate
            .first_contact_at
            .map(|t| ((now - t).max(0) as f64) / 3600.0)
            .unwrap_or(0.0);

        weight(&self.tier_weights, &candidate.customer_tier)
            + weight(&self.source_weights, &candidate.lead_source)
            + waited_hours * self.per_hour_waited
    }
}
