//! Aggregates over the normalized record table.
//!
//! Every function here is a pure read over records that are already in
//! parsed order; nothing is re-sorted by timestamp.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{CrossingRecord, DailyCount, EventSummary, Mode, TimeOfDay};

/// Records grouped by date, each group in table order.
pub fn date_buckets<'a, I>(records: I) -> BTreeMap<NaiveDate, Vec<&'a CrossingRecord>>
where
    I: IntoIterator<Item = &'a CrossingRecord>,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<&CrossingRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.date).or_default().push(record);
    }
    buckets
}

/// Vehicle count per `(date, time of day, mode)`, ordered by that key.
pub fn daily_counts<'a, I>(records: I) -> Vec<DailyCount>
where
    I: IntoIterator<Item = &'a CrossingRecord>,
{
    let mut counts: BTreeMap<(NaiveDate, TimeOfDay, Mode), usize> = BTreeMap::new();
    for (date, bucket) in date_buckets(records) {
        for record in bucket {
            *counts
                .entry((date, record.time_of_day, record.mode))
                .or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|((date, time_of_day, mode), vehicle_count)| DailyCount {
            date,
            time_of_day,
            mode,
            vehicle_count,
        })
        .collect()
}

/// First and last record per `(date, mode)` in parsed order.
///
/// "First" is the earliest row of the lowest-ordinal session file, not the
/// earliest capture time; session files are not guaranteed to be written in
/// time order.
pub fn first_last_events<'a, I>(records: I) -> Vec<EventSummary>
where
    I: IntoIterator<Item = &'a CrossingRecord>,
{
    let mut events: BTreeMap<(NaiveDate, Mode), (&CrossingRecord, &CrossingRecord)> =
        BTreeMap::new();
    for (date, bucket) in date_buckets(records) {
        for record in bucket {
            events
                .entry((date, record.mode))
                .and_modify(|(_, last)| *last = record)
                .or_insert((record, record));
        }
    }

    events
        .into_iter()
        .map(|((date, mode), (first, last))| EventSummary {
            date,
            mode,
            first: first.to_row(),
            last: last.to_row(),
        })
        .collect()
}

/// Headline totals for a (possibly filtered) table.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Totals {
    pub vehicles: usize,
    pub entry: usize,
    pub exit: usize,
    pub day: usize,
    pub night: usize,
    pub dates: usize,
}

pub fn totals<'a, I>(records: I) -> Totals
where
    I: IntoIterator<Item = &'a CrossingRecord>,
{
    let mut totals = Totals::default();
    let mut dates = std::collections::BTreeSet::new();
    for record in records {
        totals.vehicles += 1;
        match record.mode {
            Mode::Entry => totals.entry += 1,
            Mode::Exit => totals.exit += 1,
        }
        match record.time_of_day {
            TimeOfDay::Day => totals.day += 1,
            TimeOfDay::Night => totals.night += 1,
        }
        dates.insert(record.date);
    }
    totals.dates = dates.len();
    totals
}
