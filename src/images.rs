//! Image directory resolution.
//!
//! Capture software has written images into differently named folders over
//! time. Each record tries an ordered list of candidate directory names,
//! most specific first, and the first directory that exists wins. The list
//! is the same for entry and exit records.
//!
//! Each candidate is looked up in the date folder and then in the mode
//! folder, so a folder shared by every date of a mode (e.g.
//! `Exit/night_images`) is found too. Names are compared case-insensitively.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::models::TimeOfDay;

/// Inputs the candidate name generators draw from.
#[derive(Debug, Clone, Copy)]
pub struct CandidateContext<'a> {
    pub date_folder: &'a str,
    pub time_of_day: TimeOfDay,
    /// Session file name without extension and log marker.
    pub session_prefix: &'a str,
    /// Directory suffix, `_images` by default.
    pub suffix: &'a str,
}

/// A named generator for one candidate directory name.
#[derive(Clone, Copy)]
pub struct CandidateRule {
    pub name: &'static str,
    pub dir_name: fn(&CandidateContext<'_>) -> String,
}

impl std::fmt::Debug for CandidateRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateRule")
            .field("name", &self.name)
            .finish()
    }
}

/// Candidate rules in priority order.
pub const CANDIDATE_RULES: [CandidateRule; 4] = [
    CandidateRule {
        name: "date_time_of_day",
        dir_name: date_time_of_day_dir,
    },
    CandidateRule {
        name: "time_of_day",
        dir_name: time_of_day_dir,
    },
    CandidateRule {
        name: "session",
        dir_name: session_dir,
    },
    CandidateRule {
        name: "date",
        dir_name: date_dir,
    },
];

fn date_time_of_day_dir(c: &CandidateContext<'_>) -> String {
    format!("{} {}{}", c.date_folder, c.time_of_day.as_str(), c.suffix)
}

fn time_of_day_dir(c: &CandidateContext<'_>) -> String {
    format!("{}{}", c.time_of_day.as_str(), c.suffix)
}

fn session_dir(c: &CandidateContext<'_>) -> String {
    format!("{}{}", c.session_prefix, c.suffix)
}

fn date_dir(c: &CandidateContext<'_>) -> String {
    format!("{}{}", c.date_folder, c.suffix)
}

/// Candidate directory names for a record, in priority order.
pub fn candidate_names(ctx: &CandidateContext<'_>) -> Vec<String> {
    CANDIDATE_RULES.iter().map(|r| (r.dir_name)(ctx)).collect()
}

/// Subdirectories of one directory, keyed by lowercase name.
///
/// Built once per folder so every record of the folder shares one listing.
#[derive(Debug, Clone, Default)]
pub struct DirIndex {
    dirs: HashMap<String, PathBuf>,
}

impl DirIndex {
    /// List `dir`. An unreadable or missing directory gives an empty index.
    pub fn read(dir: &Path) -> Self {
        let mut dirs = HashMap::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Self { dirs };
        };

        // Candidate names are UTF-8, so other names can never match
        let mut found: Vec<(String, PathBuf)> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| Some((e.file_name().into_string().ok()?, e.path())))
            .collect();
        // Names differing only by case: first in byte order wins
        found.sort();
        for (name, path) in found {
            dirs.entry(name.to_lowercase()).or_insert(path);
        }
        Self { dirs }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.dirs.get(&name.to_lowercase()).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Which rule matched and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDir {
    pub rule: &'static str,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ImageResolver {
    pub suffix: String,
    /// Also require the image file itself to exist.
    pub verify_files: bool,
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self {
            suffix: "_images".to_string(),
            verify_files: false,
        }
    }
}

impl ImageResolver {
    /// First existing candidate directory, date folder before mode folder.
    pub fn resolve_dir(
        &self,
        date_folder: &str,
        time_of_day: TimeOfDay,
        session_prefix: &str,
        date_dirs: &DirIndex,
        mode_dirs: &DirIndex,
    ) -> Option<ResolvedDir> {
        let ctx = CandidateContext {
            date_folder,
            time_of_day,
            session_prefix,
            suffix: &self.suffix,
        };

        CANDIDATE_RULES.iter().find_map(|rule| {
            let name = (rule.dir_name)(&ctx);
            date_dirs
                .get(&name)
                .or_else(|| mode_dirs.get(&name))
                .map(|dir| ResolvedDir {
                    rule: rule.name,
                    dir: dir.to_path_buf(),
                })
        })
    }

    /// Whether a directory name carries the image folder suffix.
    pub fn is_image_dir_name(&self, name: &str) -> bool {
        name.len() >= self.suffix.len()
            && name.is_char_boundary(name.len() - self.suffix.len())
            && name[name.len() - self.suffix.len()..].eq_ignore_ascii_case(&self.suffix)
    }

    /// Join `image_filename` onto a resolved directory.
    pub fn image_path(&self, dir: &Path, image_filename: &str) -> Option<PathBuf> {
        let relative = sanitize_relative(image_filename)?;
        let path = dir.join(relative);
        if self.verify_files && !path.is_file() {
            return None;
        }
        Some(path)
    }
}

/// A logged image name as a relative path of plain segments.
///
/// `None` for anything that would leave the directory (`..`, an absolute
/// path, a drive prefix) or names nothing.
fn sanitize_relative(name: &str) -> Option<&Path> {
    let path = Path::new(name);
    let mut has_segment = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => has_segment = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    has_segment.then_some(path)
}
