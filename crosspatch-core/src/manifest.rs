use serde::{Deserialize, Serialize};

use crate::catalog::IndexedEntry;
use crate::error::AggregationError;
use crate::metadata::ContainerMetadata;

pub const DEFAULT_MOD_NAME: &str = "YOUR MOD NAME";
pub const DEFAULT_MOD_AUTHOR: &str = "Unknown";
pub const DEFAULT_MOD_VERSION: &str = "1.0";
pub const MOD_TYPE_PAK: &str = "pak";

/// Mod identity as supplied by the caller; unset fields fall back to the
/// defaults above. An explicitly empty string is kept as is.
#[derive(Clone, Debug, Default)]
pub struct ModIdentity {
    pub name: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub total_files: i64,
    pub total_size: i64,
}

impl Totals {
    /// Sum counts and sizes over every container record.
    pub fn aggregate(containers: &[ContainerMetadata]) -> Result<Self, AggregationError> {
        let mut t = Totals::default();
        for c in containers {
            t.total_files = add(t.total_files, c.file_count, &c.file_name, "file_count")?;
            t.total_size = add(t.total_size, c.total_size, &c.file_name, "total_size")?;
        }
        Ok(t)
    }
}

fn add(acc: i64, value: u64, container: &str, field: &'static str) -> Result<i64, AggregationError> {
    let v = i64::try_from(value).map_err(|_| AggregationError::Unrepresentable {
        container: container.to_string(),
        field,
        value,
    })?;
    acc.checked_add(v)
        .ok_or_else(|| AggregationError::Overflow { container: container.to_string(), field })
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PakData {
    pub pak_files: Vec<ContainerMetadata>,
    pub files_index: Vec<IndexedEntry>,
    pub total_files: i64,
    pub total_size: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModManifest {
    pub name: String,
    pub version: String,
    pub author: String,
    pub mod_type: String,
    pub pak_data: PakData,
}

impl ModManifest {
    pub fn assemble(
        identity: ModIdentity,
        pak_files: Vec<ContainerMetadata>,
        files_index: Vec<IndexedEntry>,
        totals: Totals,
    ) -> Self {
        Self {
            name: identity.name.unwrap_or_else(|| DEFAULT_MOD_NAME.to_string()),
            version: identity.version.unwrap_or_else(|| DEFAULT_MOD_VERSION.to_string()),
            author: identity.author.unwrap_or_else(|| DEFAULT_MOD_AUTHOR.to_string()),
            mod_type: MOD_TYPE_PAK.to_string(),
            pak_data: PakData {
                pak_files,
                files_index,
                total_files: totals.total_files,
                total_size: totals.total_size,
            },
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}
