use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Config;
use crate::images::ImageResolver;
use crate::models::Mode;
use crate::parser::{self, LogPatterns};
use crate::walker;

/// Health of one date folder under the log root.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub mode: Mode,
    pub folder: String,
    pub date: Option<NaiveDate>,
    pub session_files: usize,
    pub status: String,
}

pub fn get_sources(config: &Config) -> Result<Vec<SourceStatus>> {
    let patterns = LogPatterns::new(&config.logs.include_globs)?;
    let discovery = walker::walk_base(&config.logs.root);
    let images = ImageResolver {
        suffix: config.logs.image_dir_suffix.clone(),
        verify_files: false,
    };

    let mut sources = Vec::new();
    for folder in &discovery.folders {
        let date = parser::parse_date_folder(&folder.name);
        let (session_files, status) = match date {
            None if images.is_image_dir_name(&folder.name) => (0, "IMAGES".to_string()),
            None => (0, "SKIPPED (not DD-MM-YYYY)".to_string()),
            Some(_) => match parser::list_log_names(folder, &patterns) {
                Ok(names) if names.is_empty() => (0, "EMPTY".to_string()),
                Ok(names) => (names.len(), "OK".to_string()),
                Err(reason) => (0, format!("UNREADABLE ({})", reason.detail)),
            },
        };
        sources.push(SourceStatus {
            mode: folder.mode,
            folder: folder.name.clone(),
            date,
            session_files,
            status,
        });
    }

    Ok(sources)
}

pub fn list_sources(config: &Config) -> Result<()> {
    let root = &config.logs.root;
    if !root.is_dir() {
        println!("Log root does not exist: {}", root.display());
        return Ok(());
    }

    let sources = get_sources(config)?;
    if sources.is_empty() {
        println!("No entry or exit date folders under {}", root.display());
        return Ok(());
    }

    println!(
        "{:<8} {:<20} {:<12} {:>6}  STATUS",
        "MODE", "FOLDER", "DATE", "FILES"
    );
    for s in &sources {
        let date = s
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<20} {:<12} {:>6}  {}",
            s.mode.to_string(),
            s.folder,
            date,
            s.session_files,
            s.status
        );
    }

    Ok(())
}
