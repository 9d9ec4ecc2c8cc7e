use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Run a large SQL script against a database, one GO-terminated batch at a time
#[derive(Parser, Debug, Default)]
#[command(name = "bigsql", version, about, long_about = None)]
pub struct Args {
    /// Connection string: `Server=..;Database=..;User Id=..;Password=..;` or a
    /// `sqlite://`, `mysql://`, `postgres://`, `sqlserver://` URL
    #[arg(short, long, env = "BIGSQL_CONNECTION", hide_env_values = true)]
    pub connection: Option<String>,

    /// SQL script file to run
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Write the run log to this file (.txt or .log)
    #[arg(short, long, conflicts_with = "no_log")]
    pub log: Option<PathBuf>,

    /// Do not write a run log and do not ask for one
    #[arg(long, default_value_t = false)]
    pub no_log: bool,

    /// JSON file with connection, file, log and log_enabled
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Console output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Exit as soon as the run ends instead of waiting for ESC
    #[arg(long, default_value_t = false)]
    pub no_wait: bool,

    /// Also write diagnostics to stderr
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable console output
    #[default]
    Text,
    /// One JSON object per line
    Json,
}
