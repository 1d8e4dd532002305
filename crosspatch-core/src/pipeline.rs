use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::correlate::correlate;
use crate::discover::discover;
use crate::error::{Error, Result};
use crate::manifest::{ModIdentity, ModManifest, Totals};
use crate::metadata::{CountScope, MetadataBuilder};
use crate::provider::{ArchiveProvider, FileProvider, IndexLimits};

#[derive(Clone, Debug, Default)]
pub struct BuildConfig {
    /// Reported as `mount_point` on every container record.
    pub mount_point: Option<String>,
    pub scope: CountScope,
    pub limits: IndexLimits,
}

/// Check the package root and make it absolute.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(Error::InvalidInput { path: root.to_path_buf(), reason: "does not exist".into() });
    }
    if !root.is_dir() {
        return Err(Error::InvalidInput {
            path: root.to_path_buf(),
            reason: "not a directory".into(),
        });
    }
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::InvalidInput { path: root.to_path_buf(), reason: e.to_string() })?;
    Ok(cwd.join(root))
}

/// Mount everything under `root` and build its manifest.
pub fn build_manifest(root: &Path, identity: ModIdentity, cfg: &BuildConfig) -> Result<ModManifest> {
    let root = resolve_root(root)?;
    let provider = FileProvider::initialize(&root, &cfg.limits)?;
    build_manifest_with(&root, &provider, identity, cfg)
}

/// Build a manifest for `root` against an already initialized provider.
pub fn build_manifest_with<P: ArchiveProvider + ?Sized>(
    root: &Path,
    provider: &P,
    identity: ModIdentity,
    cfg: &BuildConfig,
) -> Result<ModManifest> {
    let root = resolve_root(root)?;
    let found = discover(&root)?;
    if found.is_empty() {
        warn!("No pak, utoc or ucas files under {}", root.display());
    }
    let pairs = correlate(&found.tocs, &found.payloads);

    let catalog = Catalog::read(provider);
    let builder =
        MetadataBuilder::new(&root, &catalog, cfg.mount_point.clone().unwrap_or_default(), cfg.scope);
    let pak_files = builder.build_all(&found.archives, &pairs);
    let totals = Totals::aggregate(&pak_files)?;
    info!(
        "Manifest: {} container(s), {} indexed file(s), total_files={}, total_size={}",
        pak_files.len(),
        catalog.entries.len(),
        totals.total_files,
        totals.total_size
    );
    Ok(ModManifest::assemble(identity, pak_files, catalog.entries, totals))
}
