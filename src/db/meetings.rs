// src/db/meetings.rs
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::meeting::{Meeting, MeetingOutcome, MeetingRequest, MeetingStatus};
use crate::domain::time_window::TimeWindow;
use crate::errors::SchedulingError;

const MEETING_COLUMNS: &str = "id, salesperson_id, client_id, date, start_minute, end_minute, status,
     confirmed_by_client, confirmed_by_salesperson, city, channel, outcome, outcome_notes,
     created_at, updated_at";

/// Raw row; status/outcome are parsed afterwards so a bad value surfaces
/// as a typed error instead of a rusqlite conversion failure.
struct MeetingRow {
    id: i64,
    salesperson_id: i64,
    client_id: i64,
    date: NaiveDate,
    start_minute: i32,
    end_minute: i32,
    status: String,
    confirmed_by_client: bool,
    confirmed_by_salesperson: bool,
    city: Option<String>,
    channel: Option<String>,
    outcome: Option<String>,
    outcome_notes: Option<String>,
    created_at: i64,
    updated_at: i64,
}

fn read_row(r: &Row<'_>) -> rusqlite::Result<MeetingRow> {
    Ok(MeetingRow {
        id: r.get(0)?,
        salesperson_id: r.get(1)?,
        client_id: r.get(2)?,
        date: r.get(3)?,
        start_minute: r.get(4)?,
        end_minute: r.get(5)?,
        status: r.get(6)?,
        confirmed_by_client: r.get(7)?,
        confirmed_by_salesperson: r.get(8)?,
        city: r.get(9)?,
        channel: r.get(10)?,
        outcome: r.get(11)?,
        outcome_notes: r.get(12)?,
        created_at: r.get(13)?,
        updated_at: r.get(14)?,
    })
}

impl TryFrom<MeetingRow> for Meeting {
    type Error = SchedulingError;

    fn try_from(row: MeetingRow) -> Result<Self, Self::Error> {
        Ok(Meeting {
            id: row.id,
            salesperson_id: row.salesperson_id,
            client_id: row.client_id,
            window: TimeWindow {
                date: row.date,
                start_minute: row.start_minute,
                end_minute: row.end_minute,
            },
            status: row.status.parse()?,
            confirmed_by_client: row.confirmed_by_client,
            confirmed_by_salesperson: row.confirmed_by_salesperson,
            city: row.city,
            channel: row.channel,
            outcome: row
                .outcome
                .as_deref()
                .map(str::parse::<MeetingOutcome>)
                .transpose()?,
            outcome_notes: row.outcome_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Meeting>, SchedulingError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, read_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(Meeting::try_from(r?)?);
    }
    Ok(out)
}

pub fn get_meeting(conn: &Connection, id: i64) -> Result<Option<Meeting>, SchedulingError> {
    let row = conn
        .query_row(
            &format!("select {MEETING_COLUMNS} from meetings where id = ?"),
            params![id],
            read_row,
        )
        .optional()?;
    row.map(Meeting::try_from).transpose()
}

pub fn require_meeting(conn: &Connection, id: i64) -> Result<Meeting, SchedulingError> {
    get_meeting(conn, id)?.ok_or_else(|| SchedulingError::not_found("meeting", id))
}

/// Meetings in scheduled/confirmed/rescheduled for one salesperson on one date.
pub fn active_meetings_on(
    conn: &Connection,
    salesperson_id: i64,
    date: NaiveDate,
) -> Result<Vec<Meeting>, SchedulingError> {
    collect(
        conn,
        &format!(
            "select {MEETING_COLUMNS} from meetings
             where salesperson_id = ? and date = ?
               and status in ('scheduled', 'confirmed', 'rescheduled')
             order by start_minute"
        ),
        params![salesperson_id, date],
    )
}

/// Every meeting (any status) for the agenda view.
pub fn meetings_on(
    conn: &Connection,
    salesperson_id: i64,
    date: NaiveDate,
) -> Result<Vec<Meeting>, SchedulingError> {
    collect(
        conn,
        &format!(
            "select {MEETING_COLUMNS} from meetings
             where salesperson_id = ? and date = ?
             order by start_minute, id"
        ),
        params![salesperson_id, date],
    )
}

/// First active meeting overlapping `window`, other than `exclude_id`.
pub fn find_overlapping(
    conn: &Connection,
    salesperson_id: i64,
    window: &TimeWindow,
    exclude_id: Option<i64>,
) -> Result<Option<i64>, SchedulingError> {
    let id = conn
        .query_row(
            "select id from meetings
             where salesperson_id = ?1 and date = ?2
               and status in ('scheduled', 'confirmed', 'rescheduled')
               and start_minute < ?4 and ?3 < end_minute
               and (?5 is null or id <> ?5)
             order by start_minute limit 1",
            params![
                salesperson_id,
                window.date,
                window.start_minute,
                window.end_minute,
                exclude_id
            ],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Insert in `scheduled`. An overlap slipping past the pre-check is
/// caught by the schema trigger and reported with the offending id.
pub fn insert_meeting(
    conn: &Connection,
    req: &MeetingRequest,
    now: i64,
) -> Result<Meeting, SchedulingError> {
    let res = conn.execute(
        "insert into meetings
           (salesperson_id, client_id, date, start_minute, end_minute, status,
            city, channel, created_at, updated_at)
         values (?, ?, ?, ?, ?, 'scheduled', ?, ?, ?, ?)",
        params![
            req.salesperson_id,
            req.client_id,
            req.window.date,
            req.window.start_minute,
            req.window.end_minute,
            req.city,
            req.channel,
            now,
            now
        ],
    );
    if let Err(e) = res {
        return Err(resolve_conflict(conn, e, req.salesperson_id, &req.window, None));
    }

    require_meeting(conn, conn.last_insert_rowid())
}

/// Persist every mutable field of `meeting`.
pub fn update_meeting(conn: &Connection, meeting: &Meeting, now: i64) -> Result<(), SchedulingError> {
    let res = conn.execute(
        "update meetings set
           date = ?, start_minute = ?, end_minute = ?, status = ?,
           confirmed_by_client = ?, confirmed_by_salesperson = ?,
           outcome = ?, outcome_notes = ?, updated_at = ?
         where id = ?",
        params![
            meeting.window.date,
            meeting.window.start_minute,
            meeting.window.end_minute,
            meeting.status.as_str(),
            meeting.confirmed_by_client,
            meeting.confirmed_by_salesperson,
            meeting.outcome.map(MeetingOutcome::as_str),
            meeting.outcome_notes,
            now,
            meeting.id
        ],
    );
    match res {
        Ok(0) => Err(SchedulingError::not_found("meeting", meeting.id)),
        Ok(_) => Ok(()),
        Err(e) => Err(resolve_conflict(
            conn,
            e,
            meeting.salesperson_id,
            &meeting.window,
            Some(meeting.id),
        )),
    }
}

fn resolve_conflict(
    conn: &Connection,
    e: rusqlite::Error,
    salesperson_id: i64,
    window: &TimeWindow,
    exclude_id: Option<i64>,
) -> SchedulingError {
    match SchedulingError::from(e) {
        SchedulingError::MeetingConflict { .. } => SchedulingError::MeetingConflict {
            meeting_id: find_overlapping(conn, salesperson_id, window, exclude_id)
                .ok()
                .flatten(),
        },
        other => other,
    }
}

pub fn count_active(conn: &Connection, salesperson_id: i64) -> Result<i64, SchedulingError> {
    let statuses: Vec<&str> = MeetingStatus::ACTIVE.iter().map(|s| s.as_str()).collect();
    let n = conn.query_row(
        "select count(*) from meetings where salesperson_id = ? and status in (?, ?, ?)",
        params![salesperson_id, statuses[0], statuses[1], statuses[2]],
        |r| r.get(0),
    )?;
    Ok(n)
}
