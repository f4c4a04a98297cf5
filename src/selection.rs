//! Record selection for image viewing.
//!
//! The engine keeps no selection state of its own. A caller owns a
//! [`Selection`] of record keys, mutates it as the user picks rows, and asks
//! for the images of the selected records.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::models::CrossingRecord;

/// Caller-owned set of selected record keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the key was not selected before.
    pub fn select(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn deselect(&mut self, key: &str) -> bool {
        self.keys.remove(key)
    }

    /// Flip a key; returns whether it is selected afterwards.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.keys.remove(key) {
            false
        } else {
            self.keys.insert(key.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop keys that no longer name a record, e.g. after re-ingestion.
    /// Returns the dropped keys.
    pub fn retain_known(&mut self, records: &[CrossingRecord]) -> Vec<String> {
        let known: BTreeSet<&str> = records.iter().map(|r| r.record_key.as_str()).collect();
        let stale: Vec<String> = self
            .keys
            .iter()
            .filter(|k| !known.contains(k.as_str()))
            .cloned()
            .collect();
        for key in &stale {
            self.keys.remove(key);
        }
        stale
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Whether a selected record's image can be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    Available(PathBuf),
    /// A directory resolved but the file is not there.
    FileMissing(PathBuf),
    /// No candidate image directory resolved.
    NoImage,
}

#[derive(Debug, Clone)]
pub struct ImageView<'a> {
    pub record: &'a CrossingRecord,
    pub status: ImageStatus,
}

impl ImageView<'_> {
    pub fn caption(&self) -> String {
        format!(
            "{} | Vehicle ID: {} | Plate: {}",
            self.record.mode,
            self.record.id,
            self.record.plate.as_deref().unwrap_or("-")
        )
    }
}

/// Image status of every selected record, in table order.
pub fn selected_images<'a>(
    records: &'a [CrossingRecord],
    selection: &Selection,
) -> Vec<ImageView<'a>> {
    records
        .iter()
        .filter(|r| selection.contains(&r.record_key))
        .map(|record| {
            let status = match &record.image_path {
                Some(path) if path.is_file() => ImageStatus::Available(path.clone()),
                Some(path) => ImageStatus::FileMissing(path.clone()),
                None => ImageStatus::NoImage,
            };
            ImageView { record, status }
        })
        .collect()
}
