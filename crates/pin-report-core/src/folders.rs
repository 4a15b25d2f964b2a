use crate::error::Error;
use crate::model::ReportTaskKey;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

/// Provides the per-run output location. The archive is written to this path plus
/// the archive extension.
pub trait ReportFolders: Send + Sync {
    fn report_folder(&self, key: &ReportTaskKey, date: NaiveDate) -> Result<PathBuf, Error>;
}

/// `<root>/<email>_<app>_<reportId>_<date>`
pub struct DirReportFolders {
    root: PathBuf,
}

impl DirReportFolders {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ReportFolders for DirReportFolders {
    fn report_folder(&self, key: &ReportTaskKey, date: NaiveDate) -> Result<PathBuf, Error> {
        fs::create_dir_all(&self.root)?;
        Ok(self.root.join(format!(
            "{}_{}_{}_{}",
            key.email,
            key.app_name,
            key.report_id,
            date.format("%Y-%m-%d")
        )))
    }
}
