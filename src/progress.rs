//! Ingestion progress reporting.
//!
//! Emitted on stderr so stdout stays parseable.

/// A single progress event for ingestion.
#[derive(Clone, Debug)]
pub enum IngestProgressEvent {
    /// Walking the base path.
    Discovering { root: String },
    /// One `(mode, date)` group finished, `n` of `total`.
    Processing { group: String, n: u64, total: u64 },
}

/// Reports ingestion progress. Groups finish on worker threads, so
/// implementations must be shareable.
pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  Entry/01-01-2024  3 / 40".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        match event {
            IngestProgressEvent::Discovering { root } => eprintln!("ingest {}", root),
            IngestProgressEvent::Processing { group, n, total } => {
                eprintln!("ingest  {}  {} / {}", group, n, total)
            }
        }
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match event {
            IngestProgressEvent::Discovering { root } => serde_json::json!({
                "phase": "discovering",
                "root": root,
            }),
            IngestProgressEvent::Processing { group, n, total } => serde_json::json!({
                "phase": "processing",
                "group": group,
                "n": n,
                "total": total,
            }),
        };
        eprintln!("{}", obj);
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
