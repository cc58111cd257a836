// src/db/waitlist.rs
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::time_window::SlotRange;
use crate::domain::waitlist::WaitlistEntry;
use crate::errors::SchedulingError;

const ENTRY_COLUMNS: &str = "id, resource_id, date_start, date_end, start_minute, end_minute,
     requester_id, score, enqueued_at_ms";

fn read_entry(r: &Row<'_>) -> rusqlite::Result<WaitlistEntry> {
    Ok(WaitlistEntry {
        id: r.get(0)?,
        resource_id: r.get(1)?,
        slot: SlotRange {
            date_start: r.get(2)?,
            date_end: r.get(3)?,
            start_minute: r.get(4)?,
            end_minute: r.get(5)?,
        },
        requester_id: r.get(6)?,
        score: r.get(7)?,
        enqueued_at_ms: r.get(8)?,
    })
}

pub fn get_entry(conn: &Connection, id: i64) -> Result<Option<WaitlistEntry>, SchedulingError> {
    Ok(conn
        .query_row(
            &format!("select {ENTRY_COLUMNS} from waitlist_entries where id = ?"),
            params![id],
            read_entry,
        )
        .optional()?)
}

/// Entries for a resource in storage order. Ranking happens in
/// `domain::waitlist`, never here.
pub fn for_resource(conn: &Connection, resource_id: i64) -> Result<Vec<WaitlistEntry>, SchedulingError> {
    let mut stmt = conn.prepare(&format!(
        "select {ENTRY_COLUMNS} from waitlist_entries where resource_id = ?"
    ))?;
    let rows = stmt.query_map(params![resource_id], read_entry)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert_entry(
    conn: &Connection,
    resource_id: i64,
    slot: &SlotRange,
    requester_id: i64,
    score: f64,
    enqueued_at_ms: i64,
) -> Result<WaitlistEntry, SchedulingError> {
    conn.execute(
        "insert into waitlist_entries
           (resource_id, date_start, date_end, start_minute, end_minute,
            requester_id, score, enqueued_at_ms)
         values (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            resource_id,
            slot.date_start,
            slot.date_end,
            slot.start_minute,
            slot.end_minute,
            requester_id,
            score,
            enqueued_at_ms
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_entry(conn, id)?.ok_or_else(|| SchedulingError::not_found("waitlist entry", id))
}

/// Returns false when there was nothing to remove.
pub fn delete_entry(conn: &Connection, id: i64) -> Result<bool, SchedulingError> {
    let n = conn.execute("delete from waitlist_entries where id = ?", params![id])?;
    Ok(n == 1)
}
