use super::models::ReportRunRecord;
use super::sqlite::Database;
use crate::model::{ReportTaskKey, RunResult};
use crate::runner::RunOutcome;
use rusqlite::{params, Result, Row};

const RUN_COLUMNS: &str =
    "id, email, app_name, dash_id, report_id, finished_at, result, archive_path";

fn map_run(row: &Row<'_>) -> Result<ReportRunRecord> {
    let result: String = row.get(6)?;
    Ok(ReportRunRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        app_name: row.get(2)?,
        dash_id: row.get(3)?,
        report_id: row.get(4)?,
        finished_at: row.get(5)?,
        result: RunResult::parse(&result).unwrap_or(RunResult::Error),
        archive_path: row.get(7)?,
    })
}

impl Database {
    /// Record one finished run. A single INSERT, so readers see all of it or none.
    pub fn insert_run(&self, key: &ReportTaskKey, outcome: &RunOutcome) -> Result<i64> {
        let archive_path = outcome
            .archive
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        self.connection().execute(
            "INSERT INTO report_run \
             (email, app_name, dash_id, report_id, finished_at, result, archive_path) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                key.email,
                key.app_name,
                key.dash_id,
                key.report_id,
                outcome.finished_at,
                outcome.result.as_str(),
                archive_path
            ],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Most recent run of a report, if it ever ran.
    pub fn last_run(&self, key: &ReportTaskKey) -> Result<Option<ReportRunRecord>> {
        let sql = format!(
            "SELECT {} FROM report_run \
             WHERE email = ?1 AND app_name = ?2 AND dash_id = ?3 AND report_id = ?4 \
             ORDER BY finished_at DESC, id DESC LIMIT 1",
            RUN_COLUMNS
        );
        match self.connection().query_row(
            &sql,
            params![key.email, key.app_name, key.dash_id, key.report_id],
            map_run,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Recent runs across all reports, newest first.
    pub fn recent_runs(&self, limit: i64) -> Result<Vec<ReportRunRecord>> {
        let sql = format!(
            "SELECT {} FROM report_run ORDER BY finished_at DESC, id DESC LIMIT ?1",
            RUN_COLUMNS
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit], map_run)?
            .collect::<Result<Vec<_>>>()?;
        Ok(runs)
    }
}
