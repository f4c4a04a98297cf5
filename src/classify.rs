//! Day/night classification of session files.
//!
//! Neither rule looks at timestamps. Entry folders hold one file per capture
//! session and the last few sessions of a day are the night shift, so entry
//! files are classified by position. Exit files carry the shift in their name.

use crate::models::{Mode, SessionFile, TimeOfDay};

/// Parameters of the two classification rules.
#[derive(Debug, Clone)]
pub struct ClassifyRules {
    /// Number of trailing entry files per date that are night sessions.
    pub night_tail_files: usize,
    /// Case-insensitive marker in exit file names.
    pub night_marker: String,
}

impl Default for ClassifyRules {
    fn default() -> Self {
        Self {
            night_tail_files: 3,
            night_marker: "night".to_string(),
        }
    }
}

impl ClassifyRules {
    /// Time of day for every record of `file`.
    pub fn classify(&self, file: &SessionFile) -> TimeOfDay {
        match file.mode {
            Mode::Entry => self.classify_entry(file.ordinal_index, file.total_files),
            Mode::Exit => self.classify_exit(&file.filename),
        }
    }

    /// Night iff `ordinal >= total - tail`. Dates with `tail` or fewer files
    /// are all night.
    pub fn classify_entry(&self, ordinal_index: usize, total_files: usize) -> TimeOfDay {
        if ordinal_index >= total_files.saturating_sub(self.night_tail_files) {
            TimeOfDay::Night
        } else {
            TimeOfDay::Day
        }
    }

    pub fn classify_exit(&self, filename: &str) -> TimeOfDay {
        let marker = self.night_marker.to_lowercase();
        if filename.to_lowercase().contains(&marker) {
            TimeOfDay::Night
        } else {
            TimeOfDay::Day
        }
    }
}
