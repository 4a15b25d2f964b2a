use crate::model::RunResult;

/// One recorded report run.
#[derive(Debug, Clone)]
pub struct ReportRunRecord {
    pub id: i64,
    pub email: String,
    pub app_name: String,
    pub dash_id: i32,
    pub report_id: i32,
    pub finished_at: i64,
    pub result: RunResult,
    pub archive_path: Option<String>,
}
