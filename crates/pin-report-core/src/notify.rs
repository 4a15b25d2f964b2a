use crate::error::Error;
use crate::model::Report;
use std::path::Path;

/// Message handed to the delivery channel once an archive with data is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub download_url: String,
    pub dynamic_content: String,
}

impl ReportMail {
    pub fn for_archive(report: &Report, base_download_url: &str, archive: &Path) -> Self {
        let file_name = archive
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            recipients: report.recipients.clone(),
            subject: format!(
                "Your {} {} is ready",
                report.report_type.duration_label().to_lowercase(),
                report.display_name()
            ),
            download_url: format!("{}{}", base_download_url, file_name),
            dynamic_content: report.dynamic_section(),
        }
    }
}

/// Delivery channel for finished reports (e.g. email).
pub trait Notifier: Send + Sync {
    fn send(&self, mail: &ReportMail) -> Result<(), Error>;
}
