//! End-to-end ingestion scenarios over fixture log trees.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crossing_logs::aggregate::{daily_counts, first_last_events};
use crossing_logs::config::Config;
use crossing_logs::ingest::{run_ingest, Ingestion};
use crossing_logs::models::{IngestStatus, Mode, SkipKind, TimeOfDay};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn ingest(root: &Path) -> Ingestion {
    run_ingest(&Config::minimal().with_root(root)).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn two_rows(tag: &str) -> String {
    format!("id,image\n{tag}1,{tag}1.jpg\n{tag}2,{tag}2.jpg\n")
}

/// Night tags of the entry files of one date, in file order.
fn entry_tags(ingestion: &Ingestion) -> Vec<(String, TimeOfDay)> {
    let mut tags: Vec<(String, TimeOfDay)> = ingestion
        .records
        .iter()
        .filter(|r| r.mode == Mode::Entry)
        .map(|r| (r.source_file.filename.clone(), r.time_of_day))
        .collect();
    tags.dedup();
    tags
}

#[test]
fn four_entry_files_two_rows_each() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Entry/01-01-2024");
    for name in ["a.log", "b.log", "c.log", "d.log"] {
        write(&dir.join(name), &two_rows(&name[..1]));
    }

    let ingestion = ingest(tmp.path());
    assert_eq!(ingestion.status, IngestStatus::Complete);
    assert_eq!(
        entry_tags(&ingestion),
        vec![
            ("a.log".to_string(), TimeOfDay::Day),
            ("b.log".to_string(), TimeOfDay::Night),
            ("c.log".to_string(), TimeOfDay::Night),
            ("d.log".to_string(), TimeOfDay::Night),
        ]
    );

    let counts = daily_counts(&ingestion.records);
    assert_eq!(counts.len(), 2);
    assert_eq!(
        (counts[0].date, counts[0].time_of_day, counts[0].mode, counts[0].vehicle_count),
        (day(1), TimeOfDay::Day, Mode::Entry, 2)
    );
    assert_eq!(
        (counts[1].date, counts[1].time_of_day, counts[1].mode, counts[1].vehicle_count),
        (day(1), TimeOfDay::Night, Mode::Entry, 6)
    );
}

#[test]
fn three_entry_files_are_all_night() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("entry/02-01-2024");
    for name in ["s1.csv", "s2.csv", "s3.csv"] {
        write(&dir.join(name), &two_rows("x"));
    }

    let ingestion = ingest(tmp.path());
    assert!(ingestion
        .records
        .iter()
        .all(|r| r.time_of_day == TimeOfDay::Night));
    assert_eq!(ingestion.records.len(), 6);
}

#[test]
fn five_entry_files_split_two_three() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Entry/03-01-2024");
    for name in ["1.csv", "2.csv", "3.csv", "4.csv", "5.csv"] {
        write(&dir.join(name), "id,image\n9,9.jpg\n");
    }

    let ingestion = ingest(tmp.path());
    let by_ordinal: Vec<(usize, TimeOfDay)> = ingestion
        .records
        .iter()
        .map(|r| (r.source_file.ordinal_index, r.time_of_day))
        .collect();
    assert_eq!(
        by_ordinal,
        vec![
            (0, TimeOfDay::Day),
            (1, TimeOfDay::Day),
            (2, TimeOfDay::Night),
            (3, TimeOfDay::Night),
            (4, TimeOfDay::Night),
        ]
    );
}

#[test]
fn exit_night_marker_ignores_position() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Exit/01-01-2024");
    write(&dir.join("0_NightShift.csv"), &two_rows("n"));
    write(&dir.join("1_morning.csv"), &two_rows("m"));
    write(&dir.join("2_evening.csv"), &two_rows("e"));

    let ingestion = ingest(tmp.path());
    for record in &ingestion.records {
        let expected = if record.source_file.filename == "0_NightShift.csv" {
            TimeOfDay::Night
        } else {
            TimeOfDay::Day
        };
        assert_eq!(record.time_of_day, expected, "{}", record.record_key);
    }
}

#[test]
fn exit_night_log_falls_back_to_date_images() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Exit/01-01-2024");
    write(&dir.join("night_exit_log.csv"), "id,plate,image\n5,KA05,5.jpg\n6,KA06,6.jpg\n");
    fs::create_dir_all(dir.join("01-01-2024_images")).unwrap();

    let ingestion = ingest(tmp.path());
    assert_eq!(ingestion.records.len(), 2);
    for record in &ingestion.records {
        assert_eq!(record.time_of_day, TimeOfDay::Night);
        assert_eq!(
            record.image_path.as_deref(),
            Some(dir.join("01-01-2024_images").join(&record.image_filename).as_path())
        );
    }
}

#[test]
fn no_candidate_directory_gives_no_path() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Exit/01-01-2024");
    write(&dir.join("night_exit_log.csv"), "id,image\n5,5.jpg\n");
    // Near misses that must not count
    fs::create_dir_all(dir.join("images")).unwrap();
    fs::create_dir_all(dir.join("nights_images")).unwrap();
    write(&dir.join("night_images"), "not a directory");

    let ingestion = ingest(tmp.path());
    assert_eq!(ingestion.records.len(), 1);
    assert_eq!(ingestion.records[0].image_path, None);
    assert_eq!(ingestion.records[0].to_row().image_path, None);
}

#[test]
fn shared_night_folder_in_mode_dir() {
    let tmp = TempDir::new().unwrap();
    write(
        &tmp.path().join("Exit/04-01-2024/night_exit_log.csv"),
        "id,image\n1,1.jpg\n",
    );
    fs::create_dir_all(tmp.path().join("Exit/Night_images")).unwrap();

    let ingestion = ingest(tmp.path());
    assert_eq!(ingestion.status, IngestStatus::Complete);
    assert_eq!(
        ingestion.records[0].image_path.as_deref(),
        Some(tmp.path().join("Exit/Night_images/1.jpg").as_path())
    );
}

#[test]
fn schema_drift_and_skips() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Entry/01-01-2024");
    write(&dir.join("a.csv"), "track_id,image_filename,speed\n1,1.jpg,40\n");
    write(&dir.join("b.csv"), "");
    write(&dir.join("c.csv"), "plate,image\nKA01,1.jpg\n");
    write(&dir.join("d.csv"), "id,plate,image\n2,KA02,2.jpg\n");
    fs::create_dir_all(tmp.path().join("Entry/2024-01-02")).unwrap();

    let ingestion = ingest(tmp.path());
    assert_eq!(ingestion.status, IngestStatus::Partial);
    assert_eq!(ingestion.records.len(), 2);
    assert_eq!(ingestion.records[0].plate, None);
    assert_eq!(ingestion.records[1].plate.as_deref(), Some("KA02"));

    let kinds: Vec<SkipKind> = ingestion.skipped.iter().map(|s| s.kind).collect();
    assert!(kinds.contains(&SkipKind::EmptyFile));
    assert!(kinds.contains(&SkipKind::MalformedFile));
    assert!(kinds.contains(&SkipKind::BadDateFolderName));
    assert_eq!(ingestion.warnings().count(), 2);
}

#[test]
fn ingestion_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    for d in 1..=9 {
        for mode in ["Entry", "Exit"] {
            let dir = tmp.path().join(mode).join(format!("0{}-01-2024", d));
            for s in 0..(d % 5 + 1) {
                write(&dir.join(format!("s{}.csv", s)), &two_rows(&format!("{}{}", d, s)));
            }
            if d % 2 == 0 {
                fs::create_dir_all(dir.join("night_images")).unwrap();
            }
        }
    }

    let parallel = Config::minimal().with_root(tmp.path());
    let mut sequential = parallel.clone();
    sequential.ingest.parallel = false;

    let a = serde_json::to_string(&run_ingest(&parallel).unwrap().rows()).unwrap();
    let b = serde_json::to_string(&run_ingest(&parallel).unwrap().rows()).unwrap();
    let c = serde_json::to_string(&run_ingest(&sequential).unwrap().rows()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn first_last_follow_file_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Entry/01-01-2024");
    // Capture times run backwards across files; order still comes from file names
    write(&dir.join("a.csv"), "id,image,time\n10,10.jpg,23:00\n11,11.jpg,23:30\n");
    write(&dir.join("b.csv"), "id,image,time\n12,12.jpg,06:00\n");

    let ingestion = ingest(tmp.path());
    let events = first_last_events(&ingestion.records);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].first.id, "10");
    assert_eq!(events[0].last.id, "12");
}

#[test]
fn reingest_replaces_result() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("Entry/01-01-2024/a.csv");
    write(&file, "id,image\n1,1.jpg\n");
    assert_eq!(ingest(tmp.path()).records.len(), 1);

    write(&file, "id,image\n1,1.jpg\n2,2.jpg\n");
    assert_eq!(ingest(tmp.path()).records.len(), 2);
}

#[test]
fn same_date_in_two_folders_is_one_session_group() {
    let tmp = TempDir::new().unwrap();
    let upper = tmp.path().join("Entry/01-01-2024");
    let lower = tmp.path().join("entry/01-01-2024");
    fs::create_dir_all(&upper).unwrap();
    if lower.exists() {
        // Case-insensitive filesystem: both names are one folder
        return;
    }
    write(&upper.join("a.csv"), &two_rows("a"));
    write(&upper.join("b.csv"), &two_rows("b"));
    write(&lower.join("c.csv"), &two_rows("c"));
    write(&lower.join("d.csv"), &two_rows("d"));

    let ingestion = ingest(tmp.path());
    assert_eq!(ingestion.status, IngestStatus::Complete);
    assert_eq!(
        entry_tags(&ingestion),
        vec![
            ("a.csv".to_string(), TimeOfDay::Day),
            ("b.csv".to_string(), TimeOfDay::Night),
            ("c.csv".to_string(), TimeOfDay::Night),
            ("d.csv".to_string(), TimeOfDay::Night),
        ]
    );

    let counts = daily_counts(&ingestion.records);
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0].vehicle_count, 2);
    assert_eq!(counts[1].vehicle_count, 6);

    let events = first_last_events(&ingestion.records);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].first.id, "a1");
    assert_eq!(events[0].last.id, "d2");

    let mut keys: Vec<&str> = ingestion.records.iter().map(|r| r.record_key.as_str()).collect();
    assert_eq!(keys[0], "Entry/01-01-2024/a.csv#0");
    assert_eq!(keys[4], "entry/01-01-2024/c.csv#0");
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 8);
}
