//! Per-container records for `pak_files`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::correlate::ContainerPair;
use crate::error::ContainerProcessingError;

/// Which entries a container record describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CountScope {
    /// Every record carries the whole provider's count, size and file list.
    #[default]
    Provider,
    /// Each record only counts entries whose archive is that container.
    Container,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum ContainerLocation {
    Split { utoc_path: String, ucas_path: String },
    Archive { file_path: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContainerMetadata {
    pub file_name: String,
    #[serde(flatten)]
    pub location: ContainerLocation,
    pub file_count: u64,
    pub total_size: u64,
    pub mount_point: String,
    pub files: Vec<String>,
}

#[derive(Clone, Debug, Default)]
struct EntryView {
    file_count: u64,
    total_size: u64,
    files: Vec<String>,
}

pub struct MetadataBuilder<'a> {
    root: &'a Path,
    mount_point: String,
    scope: CountScope,
    global: EntryView,
    /// Keyed by root-relative container path.
    per_container: HashMap<String, EntryView>,
}

impl<'a> MetadataBuilder<'a> {
    pub fn new(root: &'a Path, catalog: &Catalog, mount_point: String, scope: CountScope) -> Self {
        let global = match scope {
            CountScope::Provider => EntryView {
                file_count: catalog.file_count(),
                total_size: catalog.total_size(),
                files: catalog.paths.clone(),
            },
            CountScope::Container => EntryView::default(),
        };
        let mut per_container: HashMap<String, EntryView> = HashMap::new();
        if scope == CountScope::Container {
            for (container, indices) in &catalog.by_container {
                let mut view = EntryView::default();
                for e in indices.iter().filter_map(|&i| catalog.entries.get(i)) {
                    view.file_count += 1;
                    view.total_size = view.total_size.saturating_add(e.size.unwrap_or(0));
                    view.files.push(e.path.clone());
                }
                per_container.insert(container.clone(), view);
            }
        }
        Self { root, mount_point, scope, global, per_container }
    }

    fn view(&self, rel_path: &str) -> EntryView {
        match self.scope {
            CountScope::Provider => self.global.clone(),
            CountScope::Container => self.per_container.get(rel_path).cloned().unwrap_or_default(),
        }
    }

    pub fn archive(&self, path: &Path) -> Result<ContainerMetadata, ContainerProcessingError> {
        let file_name = file_name(path)?;
        let file_path = relative_to_root(self.root, path)?;
        let view = self.view(&file_path);
        Ok(ContainerMetadata {
            file_name,
            location: ContainerLocation::Archive { file_path },
            file_count: view.file_count,
            total_size: view.total_size,
            mount_point: self.mount_point.clone(),
            files: view.files,
        })
    }

    /// Record for a split container. Tocs are tried in order; the first one
    /// that produces a record wins.
    pub fn pair(&self, pair: &ContainerPair) -> Result<ContainerMetadata, ContainerProcessingError> {
        let ucas_path = relative_to_root(self.root, &pair.payload)?;
        let mut last_err = None;
        for toc in &pair.tocs {
            match relative_to_root(self.root, toc) {
                Ok(utoc_path) => {
                    if toc.with_extension("ucas") != pair.payload {
                        // The provider only mounts a toc with a sibling payload.
                        warn!(
                            "{} is paired with {} from another directory; its entries are not mounted",
                            utoc_path, ucas_path
                        );
                    }
                    let view = self.view(&utoc_path);
                    return Ok(ContainerMetadata {
                        file_name: format!("{} (IoStore)", pair.base_name),
                        location: ContainerLocation::Split { utoc_path, ucas_path },
                        file_count: view.file_count,
                        total_size: view.total_size,
                        mount_point: self.mount_point.clone(),
                        files: view.files,
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| ContainerProcessingError::NoFileName(pair.payload.clone())))
    }

    /// Build every record, archives first. Failures are logged and the
    /// container is left out.
    pub fn build_all(&self, archives: &[PathBuf], pairs: &[ContainerPair]) -> Vec<ContainerMetadata> {
        let mut out = Vec::with_capacity(archives.len() + pairs.len());
        for path in archives {
            info!("Processing pak file: {}", path.display());
            match self.archive(path) {
                Ok(m) => out.push(m),
                Err(e) => warn!("Error processing {}: {}", path.display(), e),
            }
        }
        for pair in pairs {
            info!("Processing IoStore: {}", pair.base_name);
            match self.pair(pair) {
                Ok(m) => out.push(m),
                Err(e) => warn!("Error processing IoStore {}: {}", pair.base_name, e),
            }
        }
        out
    }
}

fn file_name(path: &Path) -> Result<String, ContainerProcessingError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ContainerProcessingError::NoFileName(path.to_path_buf()))
}

/// Path of `path` relative to `root` with forward slashes. Anything that
/// would need `..` or a prefix to reach is outside the package.
pub fn relative_to_root(root: &Path, path: &Path) -> Result<String, ContainerProcessingError> {
    let outside = || ContainerProcessingError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };
    let rel = pathdiff::diff_paths(path, root).ok_or_else(outside)?;
    if rel.as_os_str().is_empty() || rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(outside());
    }
    Ok(rel.to_string_lossy().replace('\\', "/"))
}
