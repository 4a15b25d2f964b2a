use crate::batch::BatchSummary;
use crate::error::Error;
use crate::model::ReportTaskKey;
use crate::runner::RunOutcome;

/// Trait for observing report runs.
///
/// CLI implements with tracing/indicatif; tests and embedders can use `SilentReporter`.
/// All methods have default no-op implementations.
pub trait RunReporter: Send + Sync {
    fn on_batch_start(&self, _jobs: usize) {}
    fn on_run_start(&self, _key: &ReportTaskKey) {}
    fn on_run_error(&self, _key: &ReportTaskKey, _error: &Error) {}
    fn on_run_complete(&self, _key: &ReportTaskKey, _outcome: &RunOutcome, _duration_secs: f64) {}
    fn on_run_skipped(&self, _key: &ReportTaskKey) {}
    fn on_batch_complete(&self, _summary: &BatchSummary, _duration_secs: f64) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl RunReporter for SilentReporter {}
