use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pin-report")]
#[command(about = "Turns stored pin telemetry into zipped CSV reports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate every report listed in a job file
    Run {
        /// TOML file with `[[jobs]]` entries
        jobs: PathBuf,
    },
    /// Show the most recent report runs
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// Print configuration values
    PrintConfig,
    /// Truncate the run history database
    TruncateDb,
}
