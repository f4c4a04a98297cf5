//! Export the normalized tables.
//!
//! Produces one JSON document holding the record table, the daily counts,
//! and the first/last events, for dashboards that render them. The record
//! table alone can also be written as CSV.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::aggregate::{self, Totals};
use crate::filter::RecordFilter;
use crate::ingest::Ingestion;
use crate::models::{CrossingRecord, DailyCount, EventSummary, NormalizedRow};

#[derive(Serialize)]
pub struct ExportData {
    pub root: String,
    pub status: String,
    pub totals: Totals,
    pub records: Vec<NormalizedRow>,
    pub daily_counts: Vec<DailyCount>,
    pub events: Vec<EventSummary>,
    pub skipped: Vec<ExportSkip>,
}

#[derive(Serialize)]
pub struct ExportSkip {
    pub path: String,
    pub reason: String,
    pub detail: String,
}

/// Build the export document for the records that pass `filter`.
pub fn build_export(ingestion: &Ingestion, filter: &RecordFilter) -> ExportData {
    let records: Vec<&CrossingRecord> = filter.apply(&ingestion.records).collect();

    ExportData {
        root: ingestion.root.display().to_string(),
        status: ingestion.status.to_string(),
        totals: aggregate::totals(records.iter().copied()),
        records: records.iter().map(|r| r.to_row()).collect(),
        daily_counts: aggregate::daily_counts(records.iter().copied()),
        events: aggregate::first_last_events(records.iter().copied()),
        skipped: ingestion
            .skipped
            .iter()
            .map(|s| ExportSkip {
                path: s.path.display().to_string(),
                reason: s.kind.to_string(),
                detail: s.detail.clone(),
            })
            .collect(),
    }
}

/// Export as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub fn run_export(
    ingestion: &Ingestion,
    filter: &RecordFilter,
    output: Option<&Path>,
) -> Result<()> {
    let data = build_export(ingestion, filter);
    let record_count = data.records.len();
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            eprintln!("Exported {} records to {}", record_count, path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Write rows as CSV with the output contract's column names.
pub fn write_rows_csv<W: Write>(rows: &[NormalizedRow], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
