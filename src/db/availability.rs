// src/db/availability.rs
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::availability::{
    AvailabilityRule, BlockPeriod, NewAvailabilityRule, NewBlockPeriod,
};
use crate::errors::SchedulingError;

const RULE_COLUMNS: &str =
    "id, salesperson_id, day_of_week, start_minute, end_minute, city, channel, active";

const BLOCK_COLUMNS: &str =
    "id, salesperson_id, date_start, date_end, time_start, time_end, reason, active";

fn read_rule(r: &Row<'_>) -> rusqlite::Result<AvailabilityRule> {
    Ok(AvailabilityRule {
        id: r.get(0)?,
        salesperson_id: r.get(1)?,
        day_of_week: r.get(2)?,
        start_minute: r.get(3)?,
        end_minute: r.get(4)?,
        city: r.get(5)?,
        channel: r.get(6)?,
        active: r.get(7)?,
    })
}

fn read_block(r: &Row<'_>) -> rusqlite::Result<BlockPeriod> {
    Ok(BlockPeriod {
        id: r.get(0)?,
        salesperson_id: r.get(1)?,
        date_start: r.get(2)?,
        date_end: r.get(3)?,
        time_start: r.get(4)?,
        time_end: r.get(5)?,
        reason: r.get(6)?,
        active: r.get(7)?,
    })
}

pub fn active_rules(conn: &Connection, salesperson_id: i64) -> Result<Vec<AvailabilityRule>, SchedulingError> {
    let mut stmt = conn.prepare(&format!(
        "select {RULE_COLUMNS} from availability_rules
         where salesperson_id = ? and active = 1
         order by day_of_week, start_minute"
    ))?;
    let rows = stmt.query_map(params![salesperson_id], read_rule)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_rule(conn: &Connection, id: i64) -> Result<Option<AvailabilityRule>, SchedulingError> {
    Ok(conn
        .query_row(
            &format!("select {RULE_COLUMNS} from availability_rules where id = ?"),
            params![id],
            read_rule,
        )
        .optional()?)
}

pub fn insert_rule(
    conn: &Connection,
    rule: &NewAvailabilityRule,
    now: i64,
) -> Result<AvailabilityRule, SchedulingError> {
    conn.execute(
        "insert into availability_rules
           (salesperson_id, day_of_week, start_minute, end_minute, city, channel, active, created_at)
         values (?, ?, ?, ?, ?, ?, 1, ?)",
        params![
            rule.salesperson_id,
            rule.day_of_week,
            rule.start_minute,
            rule.end_minute,
            rule.city,
            rule.channel,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_rule(conn, id)?.ok_or_else(|| SchedulingError::not_found("availability rule", id))
}

/// Returns false when the rule does not exist.
pub fn deactivate_rule(conn: &Connection, id: i64) -> Result<bool, SchedulingError> {
    let n = conn.execute(
        "update availability_rules set active = 0 where id = ?",
        params![id],
    )?;
    Ok(n == 1)
}

/// Active blocks for a salesperson, any date. Callers filter by date;
/// this is the shape the rule cache keeps.
pub fn active_blocks(conn: &Connection, salesperson_id: i64) -> Result<Vec<BlockPeriod>, SchedulingError> {
    let mut stmt = conn.prepare(&format!(
        "select {BLOCK_COLUMNS} from block_periods
         where salesperson_id = ? and active = 1
         order by date_start, id"
    ))?;
    let rows = stmt.query_map(params![salesperson_id], read_block)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Every block including deactivated ones, newest first. History view.
pub fn all_blocks(conn: &Connection, salesperson_id: i64) -> Result<Vec<BlockPeriod>, SchedulingError> {
    let mut stmt = conn.prepare(&format!(
        "select {BLOCK_COLUMNS} from block_periods
         where salesperson_id = ?
         order by date_start desc, id desc"
    ))?;
    let rows = stmt.query_map(params![salesperson_id], read_block)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_block(conn: &Connection, id: i64) -> Result<Option<BlockPeriod>, SchedulingError> {
    Ok(conn
        .query_row(
            &format!("select {BLOCK_COLUMNS} from block_periods where id = ?"),
            params![id],
            read_block,
        )
        .optional()?)
}

pub fn insert_block(
    conn: &Connection,
    block: &NewBlockPeriod,
    now: i64,
) -> Result<BlockPeriod, SchedulingError> {
    conn.execute(
        "insert into block_periods
           (salesperson_id, date_start, date_end, time_start, time_end, reason, active, created_at)
         values (?, ?, ?, ?, ?, ?, 1, ?)",
        params![
            block.salesperson_id,
            block.date_start,
            block.date_end,
            block.time_start,
            block.time_end,
            block.reason,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_block(conn, id)?.ok_or_else(|| SchedulingError::not_found("block period", id))
}

/// Soft-deactivate; the row stays for history.
pub fn deactivate_block(conn: &Connection, id: i64) -> Result<bool, SchedulingError> {
    let n = conn.execute("update block_periods set active = 0 where id = ?", params![id])?;
    Ok(n == 1)
}
