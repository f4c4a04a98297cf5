//! Core data models used throughout the crossing log engine.
//!
//! These types represent the session files, crossing records, and derived
//! rows that flow through the ingestion and aggregation pipeline.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Crossing direction of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Mode {
    Entry,
    Exit,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Entry, Mode::Exit];

    /// Match a mode directory name (`entry`, `Entry`, `EXIT`, ...).
    pub fn from_dir_name(name: &str) -> Option<Mode> {
        if name.eq_ignore_ascii_case("entry") {
            Some(Mode::Entry)
        } else if name.eq_ignore_ascii_case("exit") {
            Some(Mode::Exit)
        } else {
            None
        }
    }

    /// Lowercase form used in file-name markers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Entry => "entry",
            Mode::Exit => "exit",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Entry => write!(f, "Entry"),
            Mode::Exit => write!(f, "Exit"),
        }
    }
}

/// Day/night tag of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TimeOfDay {
    Day,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 2] = [TimeOfDay::Day, TimeOfDay::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Day => "day",
            TimeOfDay::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOfDay::Day => write!(f, "Day"),
            TimeOfDay::Night => write!(f, "Night"),
        }
    }
}

/// One log file for one date and mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    pub mode: Mode,
    pub date: NaiveDate,
    /// Name of the mode folder as found on disk (e.g. `Entry`).
    pub mode_folder: String,
    /// Name of the date folder holding the file (e.g. `01-01-2024`).
    pub date_folder: String,
    pub filename: String,
    pub path: PathBuf,
    /// Position in the ascending lexical sort of all session files of this
    /// mode and date, across every folder that holds them.
    pub ordinal_index: usize,
    /// Number of session files of this mode and date, including ones later
    /// skipped.
    pub total_files: usize,
}

/// One parsed log row after classification and image resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossingRecord {
    /// Table-unique key: `<mode folder>/<date folder>/<file>#<row>`.
    pub record_key: String,
    /// Track identifier as written in the log.
    pub id: String,
    pub plate: Option<String>,
    pub mode: Mode,
    pub date: NaiveDate,
    pub time_of_day: TimeOfDay,
    pub source_file: SessionFile,
    pub row_index: usize,
    pub image_filename: String,
    pub image_path: Option<PathBuf>,
}

impl CrossingRecord {
    pub fn to_row(&self) -> NormalizedRow {
        NormalizedRow {
            id: self.id.clone(),
            plate: self.plate.clone(),
            mode: self.mode,
            date: self.date,
            time_of_day: self.time_of_day,
            image_path: self
                .image_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        }
    }
}

/// Build the record key for a row of a session file.
///
/// Uses the folder names on disk, so `Entry/` and `entry/` stay apart.
pub fn record_key(file: &SessionFile, row_index: usize) -> String {
    format!(
        "{}/{}/{}#{}",
        file.mode_folder,
        file.date_folder,
        file.filename,
        row_index
    )
}

/// Output contract row consumed by presentation layers.
///
/// Field names and nullability are fixed; consumers bind to them by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRow {
    pub id: String,
    pub plate: Option<String>,
    pub mode: Mode,
    pub date: NaiveDate,
    #[serde(rename = "timeOfDay")]
    pub time_of_day: TimeOfDay,
    #[serde(rename = "imagePath")]
    pub image_path: Option<String>,
}

/// Vehicle count for one `(date, time of day, mode)` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    #[serde(rename = "timeOfDay")]
    pub time_of_day: TimeOfDay,
    pub mode: Mode,
    pub vehicle_count: usize,
}

/// First and last record, in parsed order, for one `(date, mode)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub date: NaiveDate,
    pub mode: Mode,
    pub first: NormalizedRow,
    pub last: NormalizedRow,
}

/// Why an input was left out of the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipKind {
    ModeFolderUnreadable,
    DateFolderUnreadable,
    BadDateFolderName,
    UnreadableFile,
    MalformedFile,
    EmptyFile,
    MalformedRow,
}

impl SkipKind {
    /// Empty files are an expected state and are skipped silently.
    pub fn is_warning(&self) -> bool {
        !matches!(self, SkipKind::EmptyFile)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipKind::ModeFolderUnreadable => "mode_folder_unreadable",
            SkipKind::DateFolderUnreadable => "date_folder_unreadable",
            SkipKind::BadDateFolderName => "bad_date_folder_name",
            SkipKind::UnreadableFile => "unreadable_file",
            SkipKind::MalformedFile => "malformed_file",
            SkipKind::EmptyFile => "empty_file",
            SkipKind::MalformedRow => "malformed_row",
        }
    }
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the accumulated skip list returned with the record table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SkipReason {
    pub path: PathBuf,
    pub kind: SkipKind,
    pub detail: String,
}

impl SkipReason {
    pub fn new(kind: SkipKind, path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.kind)?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

/// Why an ingestion produced no data at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDataReason {
    /// The base path does not exist or is not a directory.
    BaseMissing,
    /// The base path has neither an entry nor an exit folder.
    NoModeFolders,
    /// Folders were walked but no record survived.
    NoRecords,
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::BaseMissing => write!(f, "base path is missing"),
            NoDataReason::NoModeFolders => write!(f, "no entry or exit folder under base path"),
            NoDataReason::NoRecords => write!(f, "no records found"),
        }
    }
}

/// Overall outcome of an ingestion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    Complete,
    /// Some inputs were skipped with a warning, others produced records.
    Partial,
    NoData(NoDataReason),
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStatus::Complete => write!(f, "complete"),
            IngestStatus::Partial => write!(f, "partial"),
            IngestStatus::NoData(reason) => write!(f, "no data ({})", reason),
        }
    }
}
