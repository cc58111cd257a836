// src/db/reservations.rs
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::reservation::{HoldStatus, NewHold, TemporaryReservation};
use crate::domain::time_window::SlotRange;
use crate::errors::SchedulingError;

const HOLD_COLUMNS: &str = "id, resource_id, date_start, date_end, start_minute, end_minute,
     holder_id, status, created_at, expires_at, booking_id, closed_at";

struct HoldRow {
    id: i64,
    resource_id: i64,
    date_start: NaiveDate,
    date_end: NaiveDate,
    start_minute: i32,
    end_minute: i32,
    holder_id: i64,
    status: String,
    created_at: i64,
    expires_at: i64,
    booking_id: Option<i64>,
    closed_at: Option<i64>,
}

fn read_row(r: &Row<'_>) -> rusqlite::Result<HoldRow> {
    Ok(HoldRow {
        id: r.get(0)?,
        resource_id: r.get(1)?,
        date_start: r.get(2)?,
        date_end: r.get(3)?,
        start_minute: r.get(4)?,
        end_minute: r.get(5)?,
        holder_id: r.get(6)?,
        status: r.get(7)?,
        created_at: r.get(8)?,
        expires_at: r.get(9)?,
        booking_id: r.get(10)?,
        closed_at: r.get(11)?,
    })
}

impl TryFrom<HoldRow> for TemporaryReservation {
    type Error = SchedulingError;

    fn try_from(row: HoldRow) -> Result<Self, Self::Error> {
        Ok(TemporaryReservation {
            id: row.id,
            resource_id: row.resource_id,
            slot: SlotRange {
                date_start: row.date_start,
                date_end: row.date_end,
                start_minute: row.start_minute,
                end_minute: row.end_minute,
            },
            holder_id: row.holder_id,
            status: row.status.parse()?,
            created_at: row.created_at,
            expires_at: row.expires_at,
            booking_id: row.booking_id,
            closed_at: row.closed_at,
        })
    }
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<TemporaryReservation>, SchedulingError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, read_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(TemporaryReservation::try_from(r?)?);
    }
    Ok(out)
}

pub fn get_hold(conn: &Connection, id: i64) -> Result<Option<TemporaryReservation>, SchedulingError> {
    let row = conn
        .query_row(
            &format!("select {HOLD_COLUMNS} from temporary_reservations where id = ?"),
            params![id],
            read_row,
        )
        .optional()?;
    row.map(TemporaryReservation::try_from).transpose()
}

pub fn require_hold(conn: &Connection, id: i64) -> Result<TemporaryReservation, SchedulingError> {
    get_hold(conn, id)?.ok_or_else(|| SchedulingError::not_found("reservation", id))
}

/// Rows still marked active for a resource, including lapsed ones.
pub fn active_for_resource(
    conn: &Connection,
    resource_id: i64,
) -> Result<Vec<TemporaryReservation>, SchedulingError> {
    collect(
        conn,
        &format!(
            "select {HOLD_COLUMNS} from temporary_reservations
             where resource_id = ? and status = 'active'
             order by id"
        ),
        params![resource_id],
    )
}

pub fn for_resource(
    conn: &Connection,
    resource_id: i64,
) -> Result<Vec<TemporaryReservation>, SchedulingError> {
    collect(
        conn,
        &format!(
            "select {HOLD_COLUMNS} from temporary_reservations
             where resource_id = ?
             order by created_at desc, id desc"
        ),
        params![resource_id],
    )
}

/// Active rows whose expiry is strictly in the past.
pub fn lapsed(conn: &Connection, now: i64) -> Result<Vec<TemporaryReservation>, SchedulingError> {
    collect(
        conn,
        &format!(
            "select {HOLD_COLUMNS} from temporary_reservations
             where status = 'active' and expires_at < ?
             order by expires_at, id"
        ),
        params![now],
    )
}

pub fn insert_hold(conn: &Connection, hold: &NewHold) -> Result<TemporaryReservation, SchedulingError> {
    conn.execute(
        "insert into temporary_reservations
           (resource_id, date_start, date_end, start_minute, end_minute,
            holder_id, status, created_at, expires_at)
         values (?, ?, ?, ?, ?, ?, 'active', ?, ?)",
        params![
            hold.resource_id,
            hold.slot.date_start,
            hold.slot.date_end,
            hold.slot.start_minute,
            hold.slot.end_minute,
            hold.holder_id,
            hold.created_at,
            hold.expires_at
        ],
    )?;
    require_hold(conn, conn.last_insert_rowid())
}

/// Move an `active` row to a terminal status. Returns false if the row was
/// no longer active; that guard is what makes expiry fire exactly once.
pub fn close_hold(
    conn: &Connection,
    id: i64,
    to: HoldStatus,
    booking_id: Option<i64>,
    now: i64,
) -> Result<bool, SchedulingError> {
    let n = conn.execute(
        "update temporary_reservations
         set status = ?, booking_id = coalesce(?, booking_id), closed_at = ?
         where id = ? and status = 'active'",
        params![to.as_str(), booking_id, now, id],
    )?;
    Ok(n == 1)
}
