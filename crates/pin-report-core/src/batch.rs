use crate::error::Error;
use crate::model::{ReportJob, ReportTaskKey, RunResult};
use crate::progress::RunReporter;
use crate::runner::{ReportRunner, RunOutcome};
use dashmap::DashMap;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{error, info, warn};

/// Owner of the report entities' "last run" state.
pub trait ReportStore: Send + Sync {
    /// Apply a finished run in one update.
    fn record_outcome(&self, key: &ReportTaskKey, outcome: &RunOutcome) -> Result<(), Error>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub ok: usize,
    pub no_data: usize,
    pub errors: usize,
    /// Jobs refused because a run for the same key was already in flight.
    pub skipped: usize,
}

impl BatchSummary {
    fn add(&mut self, other: &BatchSummary) {
        self.ok += other.ok;
        self.no_data += other.no_data;
        self.errors += other.errors;
        self.skipped += other.skipped;
    }

    fn count(result: Option<RunResult>) -> Self {
        let mut summary = BatchSummary::default();
        match result {
            Some(RunResult::Ok) => summary.ok = 1,
            Some(RunResult::NoData) => summary.no_data = 1,
            Some(RunResult::Error) => summary.errors = 1,
            None => summary.skipped = 1,
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.ok + self.no_data + self.errors + self.skipped
    }
}

/// Runs many reports in parallel, one worker per report.
pub struct ReportBatch<'a> {
    runner: &'a ReportRunner,
    store: &'a dyn ReportStore,
    in_flight: DashMap<ReportTaskKey, ()>,
}

impl<'a> ReportBatch<'a> {
    pub fn new(runner: &'a ReportRunner, store: &'a dyn ReportStore) -> Self {
        Self {
            runner,
            store,
            in_flight: DashMap::new(),
        }
    }

    pub fn run_all(&self, jobs: &mut [ReportJob], reporter: &dyn RunReporter) -> BatchSummary {
        let start = Instant::now();
        reporter.on_batch_start(jobs.len());

        let summary = jobs
            .par_iter_mut()
            .map(|job| BatchSummary::count(self.run_one(job, reporter)))
            .reduce(BatchSummary::default, |mut acc, s| {
                acc.add(&s);
                acc
            });

        let duration = start.elapsed().as_secs_f64();
        info!(
            "Batch finished in {:.2}s: {} ok, {} no data, {} errors, {} skipped",
            duration, summary.ok, summary.no_data, summary.errors, summary.skipped
        );
        reporter.on_batch_complete(&summary, duration);
        summary
    }

    /// Run one job unless its key is already running. Returns `None` when skipped.
    pub fn run_one(&self, job: &mut ReportJob, reporter: &dyn RunReporter) -> Option<RunResult> {
        if self.in_flight.insert(job.key.clone(), ()).is_some() {
            warn!("Report {} is already running, skipping", job.key);
            reporter.on_run_skipped(&job.key);
            return None;
        }

        let outcome = self.runner.run(job, reporter);
        if let Err(err) = self.store.record_outcome(&job.key, &outcome) {
            error!("Error recording outcome of report {}: {}", job.key, err);
        }
        job.report.apply_outcome(outcome.last_run());

        self.in_flight.remove(&job.key);
        Some(outcome.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        for result in [
            Some(RunResult::Ok),
            Some(RunResult::Ok),
            Some(RunResult::NoData),
            Some(RunResult::Error),
            None,
        ] {
            summary.add(&BatchSummary::count(result));
        }
        assert_eq!(
            summary,
            BatchSummary {
                ok: 2,
                no_data: 1,
                errors: 1,
                skipped: 1
            }
        );
        assert_eq!(summary.total(), 5);
    }
}
