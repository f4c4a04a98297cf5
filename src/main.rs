//! # Crossing Logs CLI (`crossings`)
//!
//! Ingests a tree of vehicle crossing logs and prints the normalized record
//! table, daily counts, first/last events, or image lookups.
//!
//! ## Usage
//!
//! ```bash
//! crossings --config ./config/crossings.toml <command>
//! crossings --root ./Logs <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crossings sources` | List mode/date folders and their status |
//! | `crossings ingest` | Ingest and print a summary with skipped inputs |
//! | `crossings records` | Print the normalized record table |
//! | `crossings counts` | Print vehicle counts per date, time of day, and mode |
//! | `crossings events` | Print the first and last record per date and mode |
//! | `crossings export` | Write records, counts, and events as JSON |
//! | `crossings images` | Show image paths for selected records |

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use crossing_logs::config;
use crossing_logs::filter::{parse_date_arg, RecordFilter};
use crossing_logs::models::{Mode, TimeOfDay};
use crossing_logs::progress::ProgressMode;
use crossing_logs::report::{self, OutputFormat};
use crossing_logs::sources;

/// Crossing Logs CLI: ingest and summarize per-day vehicle crossing logs.
///
/// Settings are read from a TOML file when it exists; `--root` overrides
/// the configured log root.
#[derive(Parser)]
#[command(
    name = "crossings",
    about = "Crossing Logs: ingest and summarize per-day vehicle crossing logs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "./config/crossings.toml")]
    config: PathBuf,

    /// Log root directory, overriding `[logs].root`.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Ingestion progress on stderr. Defaults to human output on a TTY.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List mode/date folders and their status.
    ///
    /// Shows every date folder under the entry and exit folders, the date
    /// parsed from its name, and how many session files it holds.
    Sources,

    /// Ingest the log root and print a summary.
    ///
    /// Reports folder, file, and record counts, every skipped input with its
    /// reason, and whether the result is complete, partial, or empty.
    Ingest,

    /// Print the normalized record table.
    Records {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Print vehicle counts per date, time of day, and mode.
    Counts {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the first and last record per date and mode, in log order.
    Events {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Export records, daily counts, and events as JSON.
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show image paths for selected records.
    ///
    /// Record keys are printed in the first column of `crossings records`.
    Images {
        #[command(flatten)]
        filter: FilterArgs,

        /// Record key to select (repeatable).
        #[arg(long = "select")]
        keys: Vec<String>,

        /// Select every record that passes the filters.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Entry,
    Exit,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TimeArg {
    Day,
    Night,
}

/// Filters shared by the table commands. Empty means no restriction.
#[derive(Args)]
struct FilterArgs {
    /// Date to include, `DD-MM-YYYY` or `YYYY-MM-DD` (repeatable).
    #[arg(long = "date")]
    dates: Vec<String>,

    /// Time of day to include (repeatable).
    #[arg(long = "time", value_enum)]
    times: Vec<TimeArg>,

    /// Crossing direction to include (repeatable).
    #[arg(long = "mode", value_enum)]
    modes: Vec<ModeArg>,
}

impl FilterArgs {
    fn to_filter(&self) -> anyhow::Result<RecordFilter> {
        let dates = self
            .dates
            .iter()
            .map(|d| parse_date_arg(d))
            .collect::<anyhow::Result<BTreeSet<_>>>()?;
        let times = self
            .times
            .iter()
            .map(|t| match t {
                TimeArg::Day => TimeOfDay::Day,
                TimeArg::Night => TimeOfDay::Night,
            })
            .collect();
        let modes = self
            .modes
            .iter()
            .map(|m| match m {
                ModeArg::Entry => Mode::Entry,
                ModeArg::Exit => Mode::Exit,
            })
            .collect();
        Ok(RecordFilter {
            dates,
            times,
            modes,
        })
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; RUST_LOG=debug shows every parsed session file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = config::load_or_default(&cli.config)?;
    if let Some(root) = cli.root {
        cfg = cfg.with_root(root);
    }
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Ingest => {
            let engine = crossing_logs::ingest::Engine::from_config(&cfg)?;
            let ingestion = engine.ingest(&cfg.logs.root, progress.as_ref())?;
            report::run_ingest_report(&ingestion)?;
        }
        Commands::Records { filter, format } => {
            let filter = filter.to_filter()?;
            if let Some(ingestion) = report::load_for_report(&cfg, progress.as_ref())? {
                report::run_records(&ingestion, &filter, format)?;
            }
        }
        Commands::Counts { filter, format } => {
            let filter = filter.to_filter()?;
            if let Some(ingestion) = report::load_for_report(&cfg, progress.as_ref())? {
                report::run_counts(&ingestion, &filter, format)?;
            }
        }
        Commands::Events { filter, format } => {
            let filter = filter.to_filter()?;
            if let Some(ingestion) = report::load_for_report(&cfg, progress.as_ref())? {
                report::run_events(&ingestion, &filter, format)?;
            }
        }
        Commands::Export { filter, output } => {
            let filter = filter.to_filter()?;
            if let Some(ingestion) = report::load_for_report(&cfg, progress.as_ref())? {
                crossing_logs::export::run_export(&ingestion, &filter, output.as_deref())?;
            }
        }
        Commands::Images { filter, keys, all } => {
            let filter = filter.to_filter()?;
            if let Some(ingestion) = report::load_for_report(&cfg, progress.as_ref())? {
                report::run_images(&ingestion, &filter, &keys, all)?;
            }
        }
    }

    Ok(())
}
