use crate::clock::ManualClock;
use crate::db::{init_db, Database};
use crate::domain::meeting::MeetingRequest;
use crate::domain::time_window::{SlotRange, TimeWindow};
use crate::errors::ServerError;
use crate::notify::RecordingNotifier;
use crate::responses::ResultResp;
use crate::scheduling::{Scheduler, SchedulingPolicy};
use astra::Response;
use chrono::NaiveDate;
use std::io::Read;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 2025-03-10 12:00:00 UTC, a Monday.
pub const T0: i64 = 1_741_608_000;

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Fresh database file with the production schema applied. Every call gets
/// its own file so tests can run in parallel.
pub fn temp_db(name: &str) -> Database {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "agenda_vendas_{name}_{}_{nanos}_{n}.sqlite3",
        std::process::id()
    ));

    let db = Database::new(path.to_string_lossy().into_owned());
    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    db
}

pub struct Harness {
    pub scheduler: Scheduler,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(name: &str) -> Harness {
    harness_with(name, SchedulingPolicy::default())
}

pub fn harness_with(name: &str, policy: SchedulingPolicy) -> Harness {
    build(name, policy, RecordingNotifier::default())
}

/// Harness whose notifier fails every delivery.
pub fn failing_harness(name: &str) -> Harness {
    build(name, SchedulingPolicy::default(), RecordingNotifier::failing())
}

fn build(name: &str, policy: SchedulingPolicy, notifier: RecordingNotifier) -> Harness {
    let clock = Arc::new(ManualClock::at_unix(T0));
    let notifier = Arc::new(notifier);
    let scheduler = Scheduler::new(temp_db(name), clock.clone(), notifier.clone(), policy);
    Harness {
        scheduler,
        clock,
        notifier,
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn window(day: &str, start: &str, end: &str) -> TimeWindow {
    TimeWindow::parse(date(day), start, end).unwrap()
}

pub fn slot(day: &str, start: &str, end: &str) -> SlotRange {
    SlotRange::single_day(window(day, start, end))
}

pub fn request(salesperson_id: i64, day: &str, start: &str, end: &str) -> MeetingRequest {
    MeetingRequest {
        salesperson_id,
        client_id: 500 + salesperson_id,
        window: window(day, start, end),
        city: None,
        channel: None,
    }
}

pub fn body_json(resp: Response) -> serde_json::Value {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    serde_json::from_str(&body).unwrap()
}

/// The error a route returned; panics on success.
pub fn rejected(res: ResultResp) -> ServerError {
    match res {
        Ok(resp) => panic!("expected an error, got status {}", resp.status()),
        Err(e) => e,
    }
}
