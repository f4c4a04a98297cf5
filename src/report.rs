//! Command output for the `crossings` CLI.
//!
//! Renders an [`Ingestion`] as aligned text tables, JSON, or CSV on stdout.
//! Notices about skipped inputs go to stderr so stdout stays parseable.

use anyhow::Result;
use serde::Serialize;

use crate::aggregate;
use crate::config::Config;
use crate::export::write_rows_csv;
use crate::filter::RecordFilter;
use crate::ingest::{Engine, Ingestion};
use crate::models::{CrossingRecord, IngestStatus, NormalizedRow};
use crate::progress::IngestProgressReporter;
use crate::selection::{selected_images, ImageStatus, Selection};

/// Output format for table-shaped commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Ingest for a reporting command.
///
/// Returns `None` after printing the "no data" message, so callers can stop
/// without treating an empty tree as an error.
pub fn load_for_report(
    config: &Config,
    progress: &dyn IngestProgressReporter,
) -> Result<Option<Ingestion>> {
    let ingestion = Engine::from_config(config)?.ingest(&config.logs.root, progress)?;

    match ingestion.status {
        IngestStatus::NoData(reason) => {
            println!("No valid data found! ({})", reason);
            Ok(None)
        }
        IngestStatus::Partial => {
            eprintln!(
                "note: {} input(s) were skipped; run `crossings ingest` for details",
                ingestion.warnings().count()
            );
            Ok(Some(ingestion))
        }
        IngestStatus::Complete => Ok(Some(ingestion)),
    }
}

/// Summary of an ingestion pass, including every skipped input.
pub fn run_ingest_report(ingestion: &Ingestion) -> Result<()> {
    let warnings = ingestion.warnings().count();

    println!("ingest {}", ingestion.root.display());
    println!("  date folders: {}", ingestion.date_folders);
    println!("  session files: {}", ingestion.session_files);
    println!("  records: {}", ingestion.records.len());
    println!(
        "  skipped: {} ({} warning{})",
        ingestion.skipped.len(),
        warnings,
        if warnings == 1 { "" } else { "s" }
    );
    for skip in ingestion.warnings() {
        println!("    {}", skip);
    }

    let totals = aggregate::totals(&ingestion.records);
    if totals.vehicles > 0 {
        println!(
            "  entry: {}  exit: {}  day: {}  night: {}  dates: {}",
            totals.entry, totals.exit, totals.day, totals.night, totals.dates
        );
    }

    println!("  status: {}", ingestion.status);
    Ok(())
}

pub fn run_records(
    ingestion: &Ingestion,
    filter: &RecordFilter,
    format: OutputFormat,
) -> Result<()> {
    let records: Vec<&CrossingRecord> = filter.apply(&ingestion.records).collect();
    let rows: Vec<NormalizedRow> = records.iter().map(|r| r.to_row()).collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Csv => write_rows_csv(&rows, std::io::stdout().lock())?,
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No data available for the selected filters.");
                return Ok(());
            }
            println!("Total vehicles: {}", records.len());
            println!();
            println!(
                "{:<36} {:<8} {:<12} {:<6} {:<11} {:<6} IMAGE",
                "KEY", "ID", "PLATE", "MODE", "DATE", "TIME"
            );
            for record in &records {
                println!(
                    "{:<36} {:<8} {:<12} {:<6} {:<11} {:<6} {}",
                    record.record_key,
                    record.id,
                    record.plate.as_deref().unwrap_or("-"),
                    record.mode.to_string(),
                    record.date.format("%Y-%m-%d").to_string(),
                    record.time_of_day.to_string(),
                    record
                        .image_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
    }
    Ok(())
}

pub fn run_counts(
    ingestion: &Ingestion,
    filter: &RecordFilter,
    format: OutputFormat,
) -> Result<()> {
    let counts = aggregate::daily_counts(filter.apply(&ingestion.records));

    match format {
        OutputFormat::Json => print_json(&counts)?,
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
            for count in &counts {
                writer.serialize(count)?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if counts.is_empty() {
                println!("No data available for the selected filters.");
                return Ok(());
            }
            println!("{:<11} {:<6} {:<6} {:>8}", "DATE", "TIME", "MODE", "VEHICLES");
            for c in &counts {
                println!(
                    "{:<11} {:<6} {:<6} {:>8}",
                    c.date.format("%Y-%m-%d").to_string(),
                    c.time_of_day.to_string(),
                    c.mode.to_string(),
                    c.vehicle_count
                );
            }
        }
    }
    Ok(())
}

pub fn run_events(
    ingestion: &Ingestion,
    filter: &RecordFilter,
    format: OutputFormat,
) -> Result<()> {
    let events = aggregate::first_last_events(filter.apply(&ingestion.records));

    match format {
        OutputFormat::Json => print_json(&events)?,
        OutputFormat::Csv => {
            #[derive(Serialize)]
            struct EventLine<'a> {
                date: String,
                mode: String,
                first_id: &'a str,
                first_plate: Option<&'a str>,
                last_id: &'a str,
                last_plate: Option<&'a str>,
            }
            let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
            for e in &events {
                writer.serialize(EventLine {
                    date: e.date.format("%Y-%m-%d").to_string(),
                    mode: e.mode.to_string(),
                    first_id: &e.first.id,
                    first_plate: e.first.plate.as_deref(),
                    last_id: &e.last.id,
                    last_plate: e.last.plate.as_deref(),
                })?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if events.is_empty() {
                println!("No data available for the selected filters.");
                return Ok(());
            }
            println!(
                "{:<11} {:<6} {:<10} {:<12} {:<10} {:<12}",
                "DATE", "MODE", "FIRST ID", "FIRST PLATE", "LAST ID", "LAST PLATE"
            );
            for e in &events {
                println!(
                    "{:<11} {:<6} {:<10} {:<12} {:<10} {:<12}",
                    e.date.format("%Y-%m-%d").to_string(),
                    e.mode.to_string(),
                    e.first.id,
                    e.first.plate.as_deref().unwrap_or("-"),
                    e.last.id,
                    e.last.plate.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

/// Image availability for selected records.
///
/// With `all`, every record passing the filter is selected; otherwise only
/// `keys` are, and keys that name no record are reported.
pub fn run_images(
    ingestion: &Ingestion,
    filter: &RecordFilter,
    keys: &[String],
    all: bool,
) -> Result<()> {
    let records: Vec<CrossingRecord> = filter.apply(&ingestion.records).cloned().collect();

    let mut selection: Selection = if all {
        records.iter().map(|r| r.record_key.clone()).collect()
    } else {
        keys.iter().cloned().collect()
    };
    for stale in selection.retain_known(&records) {
        eprintln!("unknown record key: {}", stale);
    }

    if selection.is_empty() {
        println!("Select one or more vehicles to view their images.");
        return Ok(());
    }

    for view in selected_images(&records, &selection) {
        match &view.status {
            ImageStatus::Available(path) => {
                println!("{}  {}", view.caption(), path.display());
            }
            ImageStatus::FileMissing(path) => {
                println!(
                    "{}  image file missing: {}",
                    view.caption(),
                    path.display()
                );
            }
            ImageStatus::NoImage => {
                println!("No image available for {}", view.caption());
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
