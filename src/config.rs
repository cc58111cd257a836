// src/config.rs
use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::domain::reservation::MAX_HOLD_TTL_MINUTES;
use crate::domain::time_window::parse_time;
use crate::scheduling::SchedulingPolicy;

#[derive(Debug, Clone)]
pub struct BrevoConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    /// Inbox that receives booking notifications.
    pub notify_email: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    pub workers: usize,
    /// 0 disables the background sweep; an external cron can hit
    /// `POST /holds/sweep` instead.
    pub sweep_interval_secs: u64,
    pub policy: SchedulingPolicy,
    pub brevo: Option<BrevoConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr: SocketAddr = parse_or(&get, "BIND_ADDR", "127.0.0.1:3000")?;
        let database_path = get("DATABASE_PATH").unwrap_or_else(|| "agenda.sqlite3".to_string());
        let workers: usize = parse_or(&get, "SERVER_WORKERS", "8")?;
        let sweep_interval_secs: u64 = parse_or(&get, "SWEEP_INTERVAL_SECS", "300")?;

        let hold_ttl_minutes: i64 = parse_or(&get, "HOLD_TTL_MINUTES", "60")?;
        if !(1..=MAX_HOLD_TTL_MINUTES).contains(&hold_ttl_minutes) {
            bail!("HOLD_TTL_MINUTES must be between 1 and {MAX_HOLD_TTL_MINUTES}, got {hold_ttl_minutes}");
        }
        let promotion_ttl_minutes: i64 = match get("WAITLIST_PROMOTION_TTL_MINUTES") {
            Some(v) => v
                .trim()
                .parse()
                .context("Failed to parse WAITLIST_PROMOTION_TTL_MINUTES")?,
            None => hold_ttl_minutes,
        };
        if !(1..=MAX_HOLD_TTL_MINUTES).contains(&promotion_ttl_minutes) {
            bail!(
                "WAITLIST_PROMOTION_TTL_MINUTES must be between 1 and {MAX_HOLD_TTL_MINUTES}, got {promotion_ttl_minutes}"
            );
        }

        let enforce_availability = parse_bool(get("ENFORCE_AVAILABILITY").as_deref())
            .context("Failed to parse ENFORCE_AVAILABILITY")?;
        let rule_cache_ttl_secs: i64 = parse_or(&get, "RULE_CACHE_TTL_SECS", "60")?;

        let business_hours = get("BUSINESS_HOURS").unwrap_or_else(|| "08:00-18:00".to_string());
        let (open, close) = business_hours
            .split_once('-')
            .context("BUSINESS_HOURS must look like HH:MM-HH:MM")?;
        let business_open = parse_time(open).context("Failed to parse BUSINESS_HOURS start")?;
        let business_close = parse_time(close).context("Failed to parse BUSINESS_HOURS end")?;
        if business_open >= business_close {
            bail!("BUSINESS_HOURS must open before it closes, got {business_hours}");
        }

        // E-mail notifications are optional, but all-or-nothing.
        let brevo = match get("BREVO_API_KEY") {
            Some(api_key) => Some(BrevoConfig {
                api_key,
                sender_email: get("BREVO_SENDER_EMAIL")
                    .context("BREVO_SENDER_EMAIL must be set when BREVO_API_KEY is provided")?,
                sender_name: get("BREVO_SENDER_NAME").unwrap_or_else(|| "Agenda Comercial".to_string()),
                notify_email: get("NOTIFY_EMAIL")
                    .context("NOTIFY_EMAIL must be set when BREVO_API_KEY is provided")?,
            }),
            None => None,
        };

        Ok(Self {
            bind_addr,
            database_path,
            workers,
            sweep_interval_secs,
            policy: SchedulingPolicy {
                enforce_availability,
                hold_ttl_minutes,
                promotion_ttl_minutes,
                rule_cache_ttl_secs,
                business_open,
                business_close,
            },
            brevo,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Failed to parse {key}={raw:?}"))
}

fn parse_bool(v: Option<&str>) -> Result<bool> {
    match v.map(|s| s.trim().to_lowercase()).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("expected a boolean, got {other:?}"),
    }
}
