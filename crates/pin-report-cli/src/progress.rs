use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use pin_report_core::{BatchSummary, Error, ReportTaskKey, RunOutcome, RunReporter, RunResult};
use std::sync::Mutex;

/// CLI reporter: one progress bar across the batch, a line per failed or skipped run.
#[derive(Default)]
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl RunReporter for CliReporter {
    fn on_batch_start(&self, jobs: usize) {
        let pb = ProgressBar::new(jobs as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Reports [{bar:30.cyan/dim}] {pos}/{len} ({elapsed})",
        ) {
            pb.set_style(
                style
                    .progress_chars("━╸─")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_run_error(&self, key: &ReportTaskKey, error: &Error) {
        let line = format!("  {} {}: {}", "✗".red(), key, error);
        self.with_bar(|pb| pb.println(line));
    }

    fn on_run_complete(&self, key: &ReportTaskKey, outcome: &RunOutcome, duration_secs: f64) {
        self.with_bar(|pb| {
            if outcome.result == RunResult::NoData {
                pb.println(format!("  {} {}: no data ({:.2}s)", "-".yellow(), key, duration_secs));
            }
            pb.inc(1);
        });
    }

    fn on_run_skipped(&self, key: &ReportTaskKey) {
        let line = format!("  {} {}: already running", "~".yellow(), key);
        self.with_bar(|pb| {
            pb.println(line);
            pb.inc(1);
        });
    }

    fn on_batch_complete(&self, summary: &BatchSummary, duration_secs: f64) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        eprintln!(
            "  {} {} reports in {:.2}s: {} ok, {} no data, {} errors, {} skipped",
            "✓".green(),
            summary.total(),
            duration_secs,
            format!("{}", summary.ok).green(),
            format!("{}", summary.no_data).yellow(),
            format!("{}", summary.errors).red(),
            summary.skipped,
        );
    }
}
