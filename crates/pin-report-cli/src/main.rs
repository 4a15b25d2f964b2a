mod commands;
mod jobs;
mod logging;
mod notify;
mod progress;

use std::io::{self, Write};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use notify::LogNotifier;
use pin_report_core::folders::DirReportFolders;
use pin_report_core::storage::{Database, RunHistory};
use pin_report_core::{AppConfig, DiskSampleSource, ReportBatch, ReportRunner, RunResult};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match pin_report_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Run { jobs }) => {
            if let Err(err) = run_reports(&config, &jobs) {
                error!("Error: {:#}", err);
            }
        }
        Some(Commands::History { limit }) => {
            if let Err(err) = print_history(&config, limit) {
                error!("Error: {:#}", err);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        Some(Commands::TruncateDb) => {
            match prompt_confirm(
                "Are you SURE you want to delete the whole run history?",
                Some(false),
            ) {
                Ok(true) => match Database::open(&config.database_path) {
                    Ok(db) => {
                        if let Err(e) = db.truncate_all() {
                            error!("Error truncating database: {}", e);
                        } else {
                            println!("Run history truncated");
                        }
                    }
                    Err(e) => error!("Error opening database: {}", e),
                },
                _ => {
                    process::exit(0);
                }
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }
}

fn run_reports(config: &AppConfig, jobs_path: &std::path::Path) -> Result<()> {
    let mut jobs = jobs::load_jobs(jobs_path)?;
    info!("Loaded {} report jobs from {}", jobs.len(), jobs_path.display());

    let runner = ReportRunner::new(
        Arc::new(DiskSampleSource::new(&config.data_dir)),
        Arc::new(LogNotifier),
        Arc::new(DirReportFolders::new(&config.reports_dir)),
        &config.download_url,
    );
    let db = Database::open(&config.database_path)
        .with_context(|| format!("Error opening database {}", config.database_path))?;
    let history = RunHistory::new(db);

    let batch = ReportBatch::new(&runner, &history);
    let reporter = CliReporter::new();
    let summary = batch.run_all(&mut jobs, &reporter);

    info!(
        "{} ok, {} no data, {} errors",
        format!("{}", summary.ok).green(),
        format!("{}", summary.no_data).yellow(),
        format!("{}", summary.errors).red(),
    );
    Ok(())
}

fn print_history(config: &AppConfig, limit: i64) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("Error opening database {}", config.database_path))?;
    let runs = db.recent_runs(limit)?;
    if runs.is_empty() {
        println!("No report runs recorded");
        return Ok(());
    }

    for run in runs {
        let finished = Utc
            .timestamp_millis_opt(run.finished_at)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| run.finished_at.to_string());
        let result = match run.result {
            RunResult::Ok => run.result.as_str().green(),
            RunResult::NoData => run.result.as_str().yellow(),
            RunResult::Error => run.result.as_str().red(),
        };
        println!(
            "{}  {:<8} {}/{} dash {} report {}  {}",
            finished,
            result,
            run.email,
            run.app_name,
            run.dash_id,
            run.report_id,
            run.archive_path.unwrap_or_default(),
        );
    }
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
