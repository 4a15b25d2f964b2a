use crate::archive::{self, ARCHIVE_EXTENSION};
use crate::error::Error;
use crate::folders::ReportFolders;
use crate::model::{LastRun, ReportJob, RunResult};
use crate::notify::{Notifier, ReportMail};
use crate::packager::ReportPackager;
use crate::progress::RunReporter;
use crate::sample::SampleSource;
use crate::window::ReportWindow;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Result of one report run, to be applied to the report by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub result: RunResult,
    /// Completion time in epoch millis, recorded whatever the result.
    pub finished_at: i64,
    pub archive: Option<PathBuf>,
}

impl RunOutcome {
    pub fn last_run(&self) -> LastRun {
        LastRun {
            at: self.finished_at,
            result: self.result,
        }
    }
}

pub struct ReportRunner {
    samples: Arc<dyn SampleSource>,
    notifier: Arc<dyn Notifier>,
    folders: Arc<dyn ReportFolders>,
    download_url: String,
}

impl ReportRunner {
    pub fn new(
        samples: Arc<dyn SampleSource>,
        notifier: Arc<dyn Notifier>,
        folders: Arc<dyn ReportFolders>,
        download_url: &str,
    ) -> Self {
        Self {
            samples,
            notifier,
            folders,
            download_url: download_url.to_string(),
        }
    }

    pub fn run(&self, job: &ReportJob, reporter: &dyn RunReporter) -> RunOutcome {
        self.run_at(job, Utc::now(), reporter)
    }

    /// Run one report as of `now`. Never fails: errors become `RunResult::Error`.
    pub fn run_at(
        &self,
        job: &ReportJob,
        now: DateTime<Utc>,
        reporter: &dyn RunReporter,
    ) -> RunOutcome {
        let start = Instant::now();
        reporter.on_run_start(&job.key);

        let (result, archive) = match self.generate(job, now) {
            Ok((result, archive)) => (result, Some(archive)),
            Err(err) => {
                error!(
                    "Error generating report {} for user {}: {}",
                    job.report.id, job.key.email, err
                );
                reporter.on_run_error(&job.key, &err);
                (RunResult::Error, None)
            }
        };

        let outcome = RunOutcome {
            result,
            finished_at: Utc::now().timestamp_millis(),
            archive,
        };
        let elapsed = start.elapsed();
        info!(
            "Processed report {} for {}, result {}, time {} ms.",
            job.report.id,
            job.key.email,
            outcome.result,
            elapsed.as_millis()
        );
        reporter.on_run_complete(&job.key, &outcome, elapsed.as_secs_f64());
        outcome
    }

    fn generate(&self, job: &ReportJob, now: DateTime<Utc>) -> Result<(RunResult, PathBuf), Error> {
        let report = &job.report;
        let window =
            ReportWindow::compute(&report.report_type, report.granularity, now.timestamp_millis());
        debug!(
            "Report {} window starts at {}, fetch count {}",
            report.id, window.start_from, window.fetch_count
        );

        let date = now.with_timezone(&report.tz).date_naive();
        let folder = self.folders.report_folder(&job.key, date)?;
        let mut output = folder.into_os_string();
        output.push(".");
        output.push(ARCHIVE_EXTENSION);
        let output = PathBuf::from(output);

        let packager =
            ReportPackager::new(self.samples.as_ref(), &job.key, &job.dashboard, report, window)?;
        let has_data = archive::with_archive(&output, |archive| packager.package(archive))?;

        if has_data {
            let mail = ReportMail::for_archive(report, &self.download_url, &output);
            self.notifier.send(&mail)?;
            Ok((RunResult::Ok, output))
        } else {
            info!(
                "No data for report for user {} and reportId {}.",
                job.key.email, report.id
            );
            Ok((RunResult::NoData, output))
        }
    }
}
