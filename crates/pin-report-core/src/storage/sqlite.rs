use crate::batch::ReportStore;
use crate::error::Error;
use crate::model::ReportTaskKey;
use crate::runner::RunOutcome;
use rusqlite::{Connection, Result};
use std::sync::Mutex;
use tracing::debug;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode)");
        Ok(())
    }

    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version < 1 {
            debug!("Schema version {} < 1, creating run history", version);
            self.conn.execute_batch(include_str!("schema.sql"))?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.conn.execute_batch("DELETE FROM report_run;")?;
        debug!("All tables truncated");
        Ok(())
    }
}

/// Shareable run history. The connection is serialized behind a mutex so
/// batch workers can record outcomes concurrently.
pub struct RunHistory {
    db: Mutex<Database>,
}

impl RunHistory {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T>,
    ) -> std::result::Result<T, Error> {
        let db = self
            .db
            .lock()
            .map_err(|e| Error::Other(format!("Failed to lock run history: {}", e)))?;
        Ok(f(&db)?)
    }
}

impl ReportStore for RunHistory {
    fn record_outcome(
        &self,
        key: &ReportTaskKey,
        outcome: &RunOutcome,
    ) -> std::result::Result<(), Error> {
        self.with_db(|db| db.insert_run(key, outcome).map(|_| ()))
    }
}
