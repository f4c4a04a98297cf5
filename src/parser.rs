//! Log record parser.
//!
//! Lists the session files of each `(mode, date)` in exact lexical order and
//! decodes each one into raw rows. Column names drift between capture
//! software versions, so headers are matched through alias lists and the
//! plate column is optional.

use anyhow::Result;
use chrono::NaiveDate;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::ffi::OsString;
use std::path::Path;

use crate::models::{Mode, SessionFile, SkipKind, SkipReason};
use crate::walker::DateFolder;

/// Fixed `day-month-year` layout of date folder names.
pub const DATE_FOLDER_FORMAT: &str = "%d-%m-%Y";

const ID_COLUMNS: &[&str] = &["id", "track_id", "trackid", "track", "vehicle_id"];
const IMAGE_COLUMNS: &[&str] = &[
    "image",
    "image_filename",
    "imagefilename",
    "image_name",
    "image_file",
];
const PLATE_COLUMNS: &[&str] = &["plate", "plate_number", "license_plate", "number_plate"];

pub fn parse_date_folder(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name.trim(), DATE_FOLDER_FORMAT).ok()
}

/// Compiled file-name patterns that mark a file as a session log.
#[derive(Debug, Clone)]
pub struct LogPatterns {
    set: GlobSet,
}

impl LogPatterns {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(
                GlobBuilder::new(pattern)
                    .case_insensitive(true)
                    .literal_separator(true)
                    .build()?,
            );
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    pub fn is_match(&self, file_name: impl AsRef<Path>) -> bool {
        self.set.is_match(file_name)
    }
}

/// Names of the session logs directly inside a date folder, unsorted.
///
/// Names stay OS strings so they join back onto the folder path unchanged.
pub fn list_log_names(
    folder: &DateFolder,
    patterns: &LogPatterns,
) -> std::result::Result<Vec<OsString>, SkipReason> {
    let unreadable = |e: std::io::Error| {
        SkipReason::new(SkipKind::DateFolderUnreadable, &folder.path, e.to_string())
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(&folder.path).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let name = entry.file_name();
        if entry.path().is_file() && patterns.is_match(Path::new(&name)) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Number the session files of every folder that holds one `(mode, date)`.
///
/// Files are sorted by name, with the folder path breaking ties, and share
/// one ordinal sequence. Totals count every listed file, so a file that
/// later fails to decode still occupies its position.
pub fn session_group<'a>(
    mode: Mode,
    date: NaiveDate,
    listings: Vec<(&'a DateFolder, Vec<OsString>)>,
) -> Vec<(&'a DateFolder, SessionFile)> {
    let mut entries: Vec<(OsString, &'a DateFolder)> = listings
        .into_iter()
        .flat_map(|(folder, names)| names.into_iter().map(move |name| (name, folder)))
        .collect();
    entries.sort_by(|(a, fa), (b, fb)| a.cmp(b).then_with(|| fa.path.cmp(&fb.path)));

    let total_files = entries.len();
    entries
        .into_iter()
        .enumerate()
        .map(|(ordinal_index, (name, folder))| {
            let file = SessionFile {
                mode,
                date,
                mode_folder: folder.mode_folder_name(),
                date_folder: folder.name.clone(),
                filename: name.to_string_lossy().into_owned(),
                path: folder.path.join(&name),
                ordinal_index,
                total_files,
            };
            (folder, file)
        })
        .collect()
}

/// One decoded data row, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Zero-based position among the file's data rows.
    pub row_index: usize,
    pub id: String,
    pub plate: Option<String>,
    pub image_filename: String,
}

/// Decoded contents of a session file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub rows: Vec<RawRow>,
    /// Rows dropped for missing required values.
    pub skipped: Vec<SkipReason>,
}

/// Column positions of the fields the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Schema {
    id: usize,
    image: usize,
    plate: Option<usize>,
}

impl Schema {
    fn from_headers(headers: &csv::StringRecord) -> std::result::Result<Self, String> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };

        let id = find(ID_COLUMNS).ok_or_else(|| "missing id column".to_string())?;
        let image = find(IMAGE_COLUMNS).ok_or_else(|| "missing image column".to_string())?;
        Ok(Self {
            id,
            image,
            plate: find(PLATE_COLUMNS),
        })
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_")
}

/// Decode a session file into raw rows.
///
/// `Err` means the whole file contributes no records; the reason says why.
pub fn read_session_file(file: &SessionFile) -> std::result::Result<ParsedFile, SkipReason> {
    let bytes = std::fs::read(&file.path)
        .map_err(|e| SkipReason::new(SkipKind::UnreadableFile, &file.path, e.to_string()))?;
    parse_session_bytes(&file.path, &bytes)
}

fn parse_session_bytes(path: &Path, bytes: &[u8]) -> std::result::Result<ParsedFile, SkipReason> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(SkipReason::new(SkipKind::EmptyFile, path, ""));
    }

    let malformed = |detail: String| SkipReason::new(SkipKind::MalformedFile, path, detail);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers().map_err(|e| malformed(e.to_string()))?.clone();
    let schema = Schema::from_headers(&headers).map_err(malformed)?;

    let mut parsed = ParsedFile::default();
    let mut data_rows = 0usize;

    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| malformed(e.to_string()))?;
        data_rows += 1;

        let id = record.get(schema.id).unwrap_or("");
        let image = record.get(schema.image).unwrap_or("");
        if id.is_empty() || image.is_empty() {
            parsed.skipped.push(SkipReason::new(
                SkipKind::MalformedRow,
                path,
                format!("row {}: blank id or image", row_index),
            ));
            continue;
        }

        let plate = schema
            .plate
            .and_then(|i| record.get(i))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        parsed.rows.push(RawRow {
            row_index,
            id: id.to_string(),
            plate,
            image_filename: image.to_string(),
        });
    }

    if data_rows == 0 {
        return Err(SkipReason::new(SkipKind::EmptyFile, path, "header only"));
    }

    Ok(parsed)
}

/// File name without its extension and trailing `_<mode>_log` / `_log` marker.
///
/// `morning_entry_log.csv` gives `morning`, `a.log` gives `a`.
pub fn session_prefix(filename: &str, mode: Mode) -> String {
    let stem = match filename.rfind('.') {
        Some(pos) if pos > 0 => &filename[..pos],
        _ => filename,
    };

    let mode_marker = format!("_{}_log", mode.as_str());
    for marker in [mode_marker.as_str(), "_log"] {
        if let Some(prefix) = strip_suffix_ignore_case(stem, marker) {
            if !prefix.is_empty() {
                return prefix.to_string();
            }
        }
    }
    stem.to_string()
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() < suffix.len() || !s.is_char_boundary(s.len() - suffix.len()) {
        return None;
    }
    let (head, tail) = s.split_at(s.len() - suffix.len());
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}
