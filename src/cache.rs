//! Memoized ingestion.
//!
//! An ingestion is a pure function of the files under its root, so it is
//! cached per root together with a fingerprint of that tree. A lookup walks
//! the tree's metadata only (no file contents) and re-ingests when the
//! fingerprint moved.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::debug;
use walkdir::WalkDir;

use crate::ingest::{Engine, Ingestion};
use crate::progress::NoProgress;

/// SHA-256 over the relative path, type, size, and modification time of
/// every entry under `root`, in name order.
pub fn fingerprint(root: &Path) -> String {
    let mut hasher = Sha256::new();

    if !root.is_dir() {
        hasher.update(b"missing");
        return format!("{:x}", hasher.finalize());
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let Ok(entry) = entry else {
            hasher.update(b"unreadable");
            continue;
        };
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([if entry.file_type().is_dir() { b'd' } else { b'f' }]);

        if let Ok(metadata) = entry.metadata() {
            hasher.update(metadata.len().to_le_bytes());
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .unwrap_or_default();
            hasher.update(modified.as_nanos().to_le_bytes());
        }
        hasher.update(b"\0");
    }

    format!("{:x}", hasher.finalize())
}

struct CachedIngestion {
    fingerprint: String,
    ingestion: Arc<Ingestion>,
}

/// Ingestion results keyed by root path and tree fingerprint.
pub struct IngestCache {
    engine: Engine,
    entries: HashMap<PathBuf, CachedIngestion>,
}

impl IngestCache {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            entries: HashMap::new(),
        }
    }

    /// Cached ingestion of `root`, re-ingesting if the tree changed.
    pub fn get_or_ingest(&mut self, root: &Path) -> Result<Arc<Ingestion>> {
        let key = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let current = fingerprint(root);

        if let Some(cached) = self.entries.get(&key) {
            if cached.fingerprint == current {
                debug!(root = %root.display(), "ingest_cache_hit");
                return Ok(Arc::clone(&cached.ingestion));
            }
        }

        debug!(root = %root.display(), fingerprint = %current, "ingest_cache_miss");
        let ingestion = Arc::new(self.engine.ingest(root, &NoProgress)?);
        self.entries.insert(
            key,
            CachedIngestion {
                fingerprint: current,
                ingestion: Arc::clone(&ingestion),
            },
        );
        Ok(ingestion)
    }

    pub fn invalidate(&mut self, root: &Path) {
        let key = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        self.entries.remove(&key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
