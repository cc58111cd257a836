use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::SchedulingError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// How long a writer waits for the SQLite write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Thread-local connection slots, one per database path.
thread_local! {
    static DB_CONNS: RefCell<HashMap<String, Connection>> = RefCell::new(HashMap::new());
}

/// Handle to the relational store. Cheap to clone; every thread lazily
/// opens its own connection to `path`.
#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn open(&self) -> Result<Connection, SchedulingError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        debug!(path = %self.path, "opened sqlite connection");
        Ok(conn)
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, SchedulingError>
    where
        F: FnOnce(&mut Connection) -> Result<T, SchedulingError>,
    {
        DB_CONNS
            .try_with(|cell| {
                let mut slots = cell.borrow_mut();
                if !slots.contains_key(&self.path) {
                    let conn = self.open()?;
                    slots.insert(self.path.clone(), conn);
                }
                let conn = slots
                    .get_mut(&self.path)
                    .ok_or_else(|| SchedulingError::StoreUnavailable("connection slot missing".into()))?;
                f(conn)
            })
            .map_err(|_| SchedulingError::StoreUnavailable("thread-local connection unavailable".into()))?
    }

    /// Runs `f` inside a write transaction that holds the database write
    /// lock from its first statement (`BEGIN IMMEDIATE`), so a
    /// check-then-write sequence cannot interleave with another writer.
    /// Returning `Err` rolls everything back.
    pub fn transaction<F, T>(&self, f: F) -> Result<T, SchedulingError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, SchedulingError>,
    {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }
}

/// Apply the embedded schema. Safe to call on every start.
pub fn init_db(db: &Database) -> Result<(), SchedulingError> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    })?;

    info!(path = %db.path(), "database schema applied");
    Ok(())
}
