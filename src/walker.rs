//! Directory walker.
//!
//! Finds the `entry`/`exit` mode folders directly under the base path (any
//! casing) and the date folders directly under each of them. Nothing deeper
//! is visited here; session files are listed by the parser.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::{Mode, SkipKind, SkipReason};

/// One `(mode, date folder)` pair found under the base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFolder {
    pub mode: Mode,
    /// Folder name as found on disk; not yet parsed as a date.
    pub name: String,
    pub path: PathBuf,
    /// The mode folder containing this date folder.
    pub mode_dir: PathBuf,
}

impl DateFolder {
    /// Name of the containing mode folder as found on disk.
    pub fn mode_folder_name(&self) -> String {
        self.mode_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.mode.to_string())
    }
}

/// Result of walking a base path.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub base_exists: bool,
    pub mode_dirs: Vec<(Mode, PathBuf)>,
    /// Ordered by mode, then folder name.
    pub folders: Vec<DateFolder>,
    pub skipped: Vec<SkipReason>,
}

pub fn walk_base(base: &Path) -> Discovery {
    let mut discovery = Discovery::default();

    if !base.is_dir() {
        warn!(base = %base.display(), "base_path_missing");
        return discovery;
    }
    discovery.base_exists = true;

    for (path, name) in subdirectories(base, &mut discovery.skipped, SkipKind::ModeFolderUnreadable)
    {
        match Mode::from_dir_name(&name) {
            Some(mode) => discovery.mode_dirs.push((mode, path)),
            None => debug!(dir = %path.display(), "ignoring_non_mode_directory"),
        }
    }
    discovery.mode_dirs.sort();

    for (mode, mode_dir) in &discovery.mode_dirs {
        for (path, name) in
            subdirectories(mode_dir, &mut discovery.skipped, SkipKind::ModeFolderUnreadable)
        {
            discovery.folders.push(DateFolder {
                mode: *mode,
                name,
                path,
                mode_dir: mode_dir.clone(),
            });
        }
    }

    // Two mode dirs can map to the same mode; keep folders in name order per mode
    discovery
        .folders
        .sort_by(|a, b| (a.mode, &a.name, &a.path).cmp(&(b.mode, &b.name, &b.path)));

    debug!(
        base = %base.display(),
        mode_dirs = discovery.mode_dirs.len(),
        date_folders = discovery.folders.len(),
        "walk_complete"
    );

    discovery
}

/// Immediate subdirectories of `dir` as `(path, name)`, sorted by name.
/// Files and unreadable entries are left out; unreadable entries are recorded.
fn subdirectories(
    dir: &Path,
    skipped: &mut Vec<SkipReason>,
    kind: SkipKind,
) -> Vec<(PathBuf, String)> {
    let mut dirs = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf());
                warn!(path = %path.display(), error = %e, "directory_unreadable");
                skipped.push(SkipReason::new(kind, path, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        dirs.push((entry.into_path(), name));
    }

    dirs
}
