use pin_report_core::{Error, Notifier, ReportMail};
use tracing::info;

/// Logs ready reports instead of delivering them.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, mail: &ReportMail) -> Result<(), Error> {
        info!(
            "{} -> {}: {}",
            mail.subject,
            mail.recipients.join(", "),
            mail.download_url
        );
        Ok(())
    }
}
