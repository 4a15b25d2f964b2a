use anyhow::{Context, Result};
use pin_report_core::ReportJob;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct JobFile {
    #[serde(default)]
    jobs: Vec<ReportJob>,
}

/// Load report jobs (owner key, dashboard devices and report definition) from TOML.
pub fn load_jobs(path: &Path) -> Result<Vec<ReportJob>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Error reading job file {}", path.display()))?;
    parse_jobs(&text).with_context(|| format!("Error parsing job file {}", path.display()))
}

fn parse_jobs(text: &str) -> Result<Vec<ReportJob>> {
    let file: JobFile = toml::from_str(text)?;
    Ok(file.jobs)
}
