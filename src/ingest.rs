//! Ingestion pipeline orchestration.
//!
//! Coordinates one pass over a log tree: walker → parser → classification →
//! image resolution. Date folders are grouped by mode and date, since
//! `Entry/01-01-2024` and `entry/01-01-2024` share one file numbering.
//! Groups are independent of each other and are processed in parallel; the
//! merged table is sorted afterwards so the output never depends on
//! completion order.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::classify::ClassifyRules;
use crate::config::Config;
use crate::images::{DirIndex, ImageResolver};
use crate::models::{
    record_key, CrossingRecord, IngestStatus, Mode, NoDataReason, NormalizedRow, SkipKind,
    SkipReason,
};
use crate::parser::{self, LogPatterns};
use crate::progress::{IngestProgressEvent, IngestProgressReporter, NoProgress};
use crate::walker::{self, DateFolder};

/// Everything one ingestion pass produced.
#[derive(Debug, Clone)]
pub struct Ingestion {
    pub root: PathBuf,
    /// Ordered by mode, date, file ordinal, row.
    pub records: Vec<CrossingRecord>,
    /// Every input left out of `records`, ordered by path.
    pub skipped: Vec<SkipReason>,
    pub status: IngestStatus,
    pub date_folders: usize,
    pub session_files: usize,
}

impl Ingestion {
    /// The normalized output table.
    pub fn rows(&self) -> Vec<NormalizedRow> {
        self.records.iter().map(CrossingRecord::to_row).collect()
    }

    /// Skip reasons that were reported as warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &SkipReason> {
        self.skipped.iter().filter(|s| s.kind.is_warning())
    }

    pub fn has_data(&self) -> bool {
        !matches!(self.status, IngestStatus::NoData(_))
    }
}

/// The configured pipeline.
#[derive(Debug, Clone)]
pub struct Engine {
    patterns: LogPatterns,
    rules: ClassifyRules,
    images: ImageResolver,
    parallel: bool,
    threads: usize,
}

/// Every date folder of one mode and date.
#[derive(Debug)]
struct DateGroup<'a> {
    mode: Mode,
    date: NaiveDate,
    folders: Vec<&'a DateFolder>,
}

/// Output of one date group.
#[derive(Debug, Default)]
struct GroupOutput {
    records: Vec<CrossingRecord>,
    skipped: Vec<SkipReason>,
    session_files: usize,
}

impl Engine {
    pub fn from_config(config: &Config) -> Result<Self> {
        let logs = &config.logs;
        let patterns = LogPatterns::new(&logs.include_globs)
            .with_context(|| "Failed to compile logs.include_globs")?;

        Ok(Self {
            patterns,
            rules: ClassifyRules {
                night_tail_files: logs.night_tail_files,
                night_marker: logs.night_marker.clone(),
            },
            images: ImageResolver {
                suffix: logs.image_dir_suffix.clone(),
                verify_files: logs.verify_image_files,
            },
            parallel: config.ingest.parallel,
            threads: config.ingest.threads,
        })
    }

    /// Ingest the tree under `root`.
    ///
    /// Data problems never fail the call; they land in `skipped` and decide
    /// the returned status. `Err` only comes from setting up worker threads.
    pub fn ingest(&self, root: &Path, progress: &dyn IngestProgressReporter) -> Result<Ingestion> {
        progress.report(IngestProgressEvent::Discovering {
            root: root.display().to_string(),
        });

        let mut discovery = walker::walk_base(root);
        let mut skipped = std::mem::take(&mut discovery.skipped);

        let mode_indexes: HashMap<PathBuf, DirIndex> = discovery
            .mode_dirs
            .iter()
            .map(|(_, dir)| (dir.clone(), DirIndex::read(dir)))
            .collect();

        let groups = self.group_folders(&discovery.folders, &mut skipped);

        let total = groups.len() as u64;
        let done = AtomicU64::new(0);
        let process = |group: &DateGroup<'_>| {
            let output = self.process_group(group, &mode_indexes);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            let label = group.date.format(parser::DATE_FOLDER_FORMAT);
            progress.report(IngestProgressEvent::Processing {
                group: format!("{}/{}", group.mode, label),
                n,
                total,
            });
            output
        };

        let outputs: Vec<GroupOutput> = if self.parallel {
            if self.threads > 0 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.threads)
                    .build()
                    .with_context(|| format!("Failed to start {} ingest threads", self.threads))?;
                pool.install(|| groups.par_iter().map(process).collect())
            } else {
                groups.par_iter().map(process).collect()
            }
        } else {
            groups.iter().map(process).collect()
        };

        let mut records = Vec::new();
        let mut session_files = 0;
        for output in outputs {
            records.extend(output.records);
            skipped.extend(output.skipped);
            session_files += output.session_files;
        }

        // Ordinals are unique within a (mode, date) group
        records.sort_by(|a, b| {
            let ka = (a.mode, a.date, a.source_file.ordinal_index, a.row_index);
            let kb = (b.mode, b.date, b.source_file.ordinal_index, b.row_index);
            ka.cmp(&kb)
        });
        skipped.sort();

        let status = if !discovery.base_exists {
            IngestStatus::NoData(NoDataReason::BaseMissing)
        } else if discovery.mode_dirs.is_empty() {
            IngestStatus::NoData(NoDataReason::NoModeFolders)
        } else if records.is_empty() {
            IngestStatus::NoData(NoDataReason::NoRecords)
        } else if skipped.iter().any(|s| s.kind.is_warning()) {
            IngestStatus::Partial
        } else {
            IngestStatus::Complete
        };

        info!(
            root = %root.display(),
            date_folders = discovery.folders.len(),
            session_files,
            records = records.len(),
            skipped = skipped.len(),
            status = %status,
            "ingest_complete"
        );

        Ok(Ingestion {
            root: root.to_path_buf(),
            records,
            skipped,
            status,
            date_folders: discovery.folders.len(),
            session_files,
        })
    }

    /// Group date folders by `(mode, date)`.
    ///
    /// `Entry/01-01-2024` and `entry/1-1-2024` land in one group. Folders
    /// whose name is not a date are skipped, except shared image folders,
    /// which are left alone.
    fn group_folders<'a>(
        &self,
        folders: &'a [DateFolder],
        skipped: &mut Vec<SkipReason>,
    ) -> Vec<DateGroup<'a>> {
        let mut groups: BTreeMap<(Mode, NaiveDate), Vec<&'a DateFolder>> = BTreeMap::new();

        for folder in folders {
            if let Some(date) = parser::parse_date_folder(&folder.name) {
                groups.entry((folder.mode, date)).or_default().push(folder);
            } else if self.images.is_image_dir_name(&folder.name) {
                debug!(dir = %folder.path.display(), "ignoring_image_directory");
            } else {
                let reason = SkipReason::new(
                    SkipKind::BadDateFolderName,
                    &folder.path,
                    format!("expected {}", parser::DATE_FOLDER_FORMAT),
                );
                note_skip(&reason);
                skipped.push(reason);
            }
        }

        groups
            .into_iter()
            .map(|((mode, date), folders)| DateGroup {
                mode,
                date,
                folders,
            })
            .collect()
    }

    fn process_group(
        &self,
        group: &DateGroup<'_>,
        mode_indexes: &HashMap<PathBuf, DirIndex>,
    ) -> GroupOutput {
        let mut output = GroupOutput::default();

        let mut listings = Vec::with_capacity(group.folders.len());
        for &folder in &group.folders {
            match parser::list_log_names(folder, &self.patterns) {
                Ok(names) => listings.push((folder, names)),
                Err(reason) => {
                    note_skip(&reason);
                    output.skipped.push(reason);
                }
            }
        }
        let files = parser::session_group(group.mode, group.date, listings);
        output.session_files = files.len();

        let date_indexes: HashMap<&Path, DirIndex> = group
            .folders
            .iter()
            .map(|f| (f.path.as_path(), DirIndex::read(&f.path)))
            .collect();
        let no_dirs = DirIndex::default();

        for (folder, file) in files {
            let parsed = match parser::read_session_file(&file) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    note_skip(&reason);
                    output.skipped.push(reason);
                    continue;
                }
            };
            for reason in &parsed.skipped {
                note_skip(reason);
            }
            output.skipped.extend(parsed.skipped);

            let time_of_day = self.rules.classify(&file);
            let prefix = parser::session_prefix(&file.filename, file.mode);
            let date_index = date_indexes.get(folder.path.as_path()).unwrap_or(&no_dirs);
            let mode_index = mode_indexes.get(&folder.mode_dir).unwrap_or(&no_dirs);
            let resolved =
                self.images
                    .resolve_dir(&folder.name, time_of_day, &prefix, date_index, mode_index);

            debug!(
                file = %file.path.display(),
                ordinal = file.ordinal_index,
                total = file.total_files,
                time_of_day = %time_of_day,
                image_rule = resolved.as_ref().map(|r| r.rule).unwrap_or("none"),
                rows = parsed.rows.len(),
                "session_file_parsed"
            );

            for row in parsed.rows {
                let image_path = resolved
                    .as_ref()
                    .and_then(|r| self.images.image_path(&r.dir, &row.image_filename));
                output.records.push(CrossingRecord {
                    record_key: record_key(&file, row.row_index),
                    id: row.id,
                    plate: row.plate,
                    mode: file.mode,
                    date: file.date,
                    time_of_day,
                    source_file: file.clone(),
                    row_index: row.row_index,
                    image_filename: row.image_filename,
                    image_path,
                });
            }
        }

        output
    }
}

fn note_skip(reason: &SkipReason) {
    if reason.kind.is_warning() {
        warn!(
            path = %reason.path.display(),
            reason = %reason.kind,
            detail = %reason.detail,
            "input_skipped"
        );
    } else {
        debug!(path = %reason.path.display(), reason = %reason.kind, "input_skipped");
    }
}

/// Ingest the configured log root without progress output.
pub fn run_ingest(config: &Config) -> Result<Ingestion> {
    Engine::from_config(config)?.ingest(&config.logs.root, &NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeOfDay;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> Config {
        Config::minimal().with_root(root)
    }

    #[test]
    fn test_missing_base_is_no_data() {
        let config = config_for(Path::new("/nonexistent/crossings"));
        let ingestion = run_ingest(&config).unwrap();
        assert_eq!(
            ingestion.status,
            IngestStatus::NoData(NoDataReason::BaseMissing)
        );
        assert!(!ingestion.has_data());
    }

    #[test]
    fn test_base_without_mode_folders() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("misc")).unwrap();
        let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
        assert_eq!(
            ingestion.status,
            IngestStatus::NoData(NoDataReason::NoModeFolders)
        );
    }

    #[test]
    fn test_empty_files_only_is_no_records() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("Entry/01-01-2024");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.csv"), "").unwrap();

        let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
        assert_eq!(
            ingestion.status,
            IngestStatus::NoData(NoDataReason::NoRecords)
        );
        assert_eq!(ingestion.skipped.len(), 1);
        assert_eq!(ingestion.warnings().count(), 0);
    }

    #[test]
    fn test_empty_file_keeps_ordinal_position() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("Entry/01-01-2024");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.csv"), "id,image\n1,1.jpg\n").unwrap();
        fs::write(dir.join("b.csv"), "").unwrap();
        fs::write(dir.join("c.csv"), "id,image\n2,2.jpg\n").unwrap();
        fs::write(dir.join("d.csv"), "id,image\n3,3.jpg\n").unwrap();
        fs::write(dir.join("e.csv"), "id,image\n4,4.jpg\n").unwrap();

        let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
        assert_eq!(ingestion.status, IngestStatus::Complete);
        let tags: Vec<(&str, TimeOfDay)> = ingestion
            .records
            .iter()
            .map(|r| (r.source_file.filename.as_str(), r.time_of_day))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("a.csv", TimeOfDay::Day),
                ("c.csv", TimeOfDay::Night),
                ("d.csv", TimeOfDay::Night),
                ("e.csv", TimeOfDay::Night),
            ]
        );
    }

    #[test]
    fn test_bad_folder_name_is_partial() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("Exit/02-01-2024");
        fs::create_dir_all(&good).unwrap();
        fs::create_dir_all(tmp.path().join("Exit/backup")).unwrap();
        fs::write(good.join("day_exit_log.csv"), "id,image\n1,1.jpg\n").unwrap();

        let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
        assert_eq!(ingestion.status, IngestStatus::Partial);
        assert_eq!(ingestion.records.len(), 1);
        assert_eq!(ingestion.records[0].mode, Mode::Exit);
        let warnings: Vec<&SkipReason> = ingestion.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, SkipKind::BadDateFolderName);
    }

    /// Creates `dirs` under `root`; false on a case-insensitive filesystem.
    fn distinct_dirs(root: &Path, dirs: &[&str]) -> bool {
        for dir in dirs {
            if root.join(dir).exists() {
                return false;
            }
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        true
    }

    #[test]
    fn test_record_keys_are_unique() {
        let tmp = TempDir::new().unwrap();
        let dirs = ["Entry/01-01-2024", "entry/01-01-2024", "Exit/01-01-2024"];
        if !distinct_dirs(tmp.path(), &dirs) {
            return;
        }
        for dir in dirs {
            fs::write(
                tmp.path().join(dir).join("s.csv"),
                "id,image\n1,1.jpg\n1,1b.jpg\n",
            )
            .unwrap();
        }

        let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
        let keys: Vec<&str> = ingestion.records.iter().map(|r| r.record_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "Entry/01-01-2024/s.csv#0",
                "Entry/01-01-2024/s.csv#1",
                "entry/01-01-2024/s.csv#0",
                "entry/01-01-2024/s.csv#1",
                "Exit/01-01-2024/s.csv#0",
                "Exit/01-01-2024/s.csv#1",
            ]
        );
    }

    #[test]
    fn test_folders_of_one_date_are_numbered_together() {
        let tmp = TempDir::new().unwrap();
        if !distinct_dirs(tmp.path(), &["Entry/01-01-2024", "entry/01-01-2024"]) {
            return;
        }
        for (dir, name) in [
            ("Entry/01-01-2024", "a.csv"),
            ("Entry/01-01-2024", "b.csv"),
            ("entry/01-01-2024", "c.csv"),
            ("entry/01-01-2024", "d.csv"),
        ] {
            fs::write(tmp.path().join(dir).join(name), "id,image\n1,1.jpg\n").unwrap();
        }

        let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
        let tags: Vec<(&str, usize, usize, TimeOfDay)> = ingestion
            .records
            .iter()
            .map(|r| {
                let f = &r.source_file;
                (f.filename.as_str(), f.ordinal_index, f.total_files, r.time_of_day)
            })
            .collect();
        assert_eq!(
            tags,
            vec![
                ("a.csv", 0, 4, TimeOfDay::Day),
                ("b.csv", 1, 4, TimeOfDay::Night),
                ("c.csv", 2, 4, TimeOfDay::Night),
                ("d.csv", 3, 4, TimeOfDay::Night),
            ]
        );
    }

    #[test]
    fn test_unpadded_folder_name_joins_its_date() {
        let tmp = TempDir::new().unwrap();
        let padded = tmp.path().join("Entry/01-01-2024");
        let unpadded = tmp.path().join("Entry/1-1-2024");
        fs::create_dir_all(&padded).unwrap();
        fs::create_dir_all(&unpadded).unwrap();
        fs::write(padded.join("a.csv"), "id,image\n1,1.jpg\n").unwrap();
        fs::write(padded.join("c.csv"), "id,image\n3,3.jpg\n").unwrap();
        fs::write(unpadded.join("b.csv"), "id,image\n2,2.jpg\n").unwrap();
        fs::write(unpadded.join("d.csv"), "id,image\n4,4.jpg\n").unwrap();

        let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
        assert_eq!(ingestion.status, IngestStatus::Complete);
        let ids: Vec<&str> = ingestion.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(ingestion.records[0].time_of_day, TimeOfDay::Day);
        assert!(ingestion.records[1..]
            .iter()
            .all(|r| r.time_of_day == TimeOfDay::Night));
        assert_eq!(ingestion.records[1].source_file.date_folder, "1-1-2024");
    }

    #[cfg(unix)]
    mod unreadable {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn set_mode(path: &Path, mode: u32) {
            fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
        }

        #[test]
        fn test_unreadable_file_is_skipped() {
            let tmp = TempDir::new().unwrap();
            let dir = tmp.path().join("Entry/01-01-2024");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("a.csv"), "id,image\n1,1.jpg\n").unwrap();
            let locked = dir.join("b.csv");
            fs::write(&locked, "id,image\n2,2.jpg\n").unwrap();
            set_mode(&locked, 0o000);
            // Privileged users read it anyway
            if fs::read(&locked).is_ok() {
                set_mode(&locked, 0o644);
                return;
            }

            let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
            set_mode(&locked, 0o644);

            assert_eq!(ingestion.status, IngestStatus::Partial);
            assert_eq!(ingestion.records.len(), 1);
            assert_eq!(ingestion.session_files, 2);
            let warnings: Vec<&SkipReason> = ingestion.warnings().collect();
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].kind, SkipKind::UnreadableFile);
            assert_eq!(warnings[0].path, locked);
        }

        #[test]
        fn test_unreadable_date_folder_is_skipped() {
            let tmp = TempDir::new().unwrap();
            let good = tmp.path().join("Exit/01-01-2024");
            let locked = tmp.path().join("Exit/02-01-2024");
            fs::create_dir_all(&good).unwrap();
            fs::create_dir_all(&locked).unwrap();
            fs::write(good.join("day.csv"), "id,image\n1,1.jpg\n").unwrap();
            fs::write(locked.join("day.csv"), "id,image\n2,2.jpg\n").unwrap();
            set_mode(&locked, 0o000);
            if fs::read_dir(&locked).is_ok() {
                set_mode(&locked, 0o755);
                return;
            }

            let ingestion = run_ingest(&config_for(tmp.path())).unwrap();
            set_mode(&locked, 0o755);

            assert_eq!(ingestion.status, IngestStatus::Partial);
            assert_eq!(ingestion.records.len(), 1);
            let warnings: Vec<&SkipReason> = ingestion.warnings().collect();
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].kind, SkipKind::DateFolderUnreadable);
            assert_eq!(warnings[0].path, locked);
        }
    }

    #[test]
    fn test_fixed_thread_pool() {
        let tmp = TempDir::new().unwrap();
        for day in 1..=4 {
            let dir = tmp.path().join(format!("Entry/0{}-01-2024", day));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("s.csv"), "id,image\n1,1.jpg\n").unwrap();
        }
        let mut config = config_for(tmp.path());
        config.ingest.threads = 2;
        let ingestion = run_ingest(&config).unwrap();
        assert_eq!(ingestion.records.len(), 4);
        assert!(ingestion
            .records
            .windows(2)
            .all(|w| w[0].date < w[1].date));
    }
}
