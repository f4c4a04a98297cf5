//! Multi-select filter over the record table.
//!
//! Each dimension is a set of accepted values; an empty set accepts
//! everything, so a default filter passes the whole table through.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::{CrossingRecord, Mode, TimeOfDay};
use crate::parser::DATE_FOLDER_FORMAT;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub dates: BTreeSet<NaiveDate>,
    pub times: BTreeSet<TimeOfDay>,
    pub modes: BTreeSet<Mode>,
}

impl RecordFilter {
    pub fn matches(&self, record: &CrossingRecord) -> bool {
        (self.dates.is_empty() || self.dates.contains(&record.date))
            && (self.times.is_empty() || self.times.contains(&record.time_of_day))
            && (self.modes.is_empty() || self.modes.contains(&record.mode))
    }

    pub fn apply<'a>(
        &'a self,
        records: &'a [CrossingRecord],
    ) -> impl Iterator<Item = &'a CrossingRecord> + 'a {
        records.iter().filter(move |r| self.matches(r))
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() && self.times.is_empty() && self.modes.is_empty()
    }
}

/// Parse a date given as `DD-MM-YYYY` (folder form) or `YYYY-MM-DD`.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FOLDER_FORMAT) {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    bail!("Invalid date '{}': expected DD-MM-YYYY or YYYY-MM-DD", s)
}
