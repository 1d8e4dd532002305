use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::{ArchiveProvider, EntryRecord};

/// One `files_index` row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IndexedEntry {
    pub path: String,
    pub size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub offset: Option<u64>,
    pub archive: Option<String>,
}

impl IndexedEntry {
    pub fn from_record(path: &str, rec: &impl EntryRecord) -> Self {
        Self {
            path: path.to_string(),
            size: rec.size(),
            compressed_size: rec.compressed_size(),
            offset: rec.offset(),
            archive: rec.archive_name().map(str::to_string),
        }
    }
}

/// Snapshot of the provider taken once per run.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    /// Every provider path, including ones that failed to resolve.
    pub paths: Vec<String>,
    /// Resolved entries, in provider order.
    pub entries: Vec<IndexedEntry>,
    /// Indices into `entries`, grouped by root-relative container path.
    /// Entries whose record names no container are not grouped.
    pub by_container: BTreeMap<String, Vec<usize>>,
    pub skipped: usize,
}

impl Catalog {
    pub fn read<P: ArchiveProvider + ?Sized>(provider: &P) -> Self {
        let mut cat = Catalog::default();
        for path in provider.paths() {
            cat.paths.push(path.to_string());
            match provider.entry(path) {
                Ok(rec) => {
                    if let Some(container) = rec.container_path() {
                        let at = cat.entries.len();
                        cat.by_container.entry(container.to_string()).or_default().push(at);
                    }
                    cat.entries.push(IndexedEntry::from_record(path, &rec));
                }
                Err(e) => {
                    debug!("skipping entry: {}", e);
                    cat.skipped += 1;
                }
            }
        }
        if cat.skipped > 0 {
            debug!("{} of {} entries could not be introspected", cat.skipped, cat.paths.len());
        }
        cat
    }

    pub fn file_count(&self) -> u64 {
        self.paths.len() as u64
    }

    /// Sum of known sizes; entries without a size count as zero.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().filter_map(|e| e.size).fold(0u64, u64::saturating_add)
    }
}
