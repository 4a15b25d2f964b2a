pub mod archive;
pub mod batch;
pub mod config;
pub mod csv_rows;
pub mod error;
pub mod folders;
pub mod model;
pub mod naming;
pub mod notify;
pub mod packager;
pub mod progress;
pub mod runner;
pub mod sample;
pub mod storage;
pub mod window;

pub use batch::{BatchSummary, ReportBatch, ReportStore};
pub use config::AppConfig;
pub use error::Error;
pub use model::{Report, ReportJob, ReportTaskKey, RunResult};
pub use notify::{Notifier, ReportMail};
pub use progress::{RunReporter, SilentReporter};
pub use runner::{ReportRunner, RunOutcome};
pub use sample::{DiskSampleSource, SampleSource};
