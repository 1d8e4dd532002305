use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::info;
use walkdir::WalkDir;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Monolithic `.pak` archive.
    Archive,
    /// IoStore table of contents, `.utoc`.
    Toc,
    /// IoStore payload, `.ucas`.
    Payload,
}

/// Case-insensitive extension matchers for the three container classes.
pub struct ExtensionClasses {
    archive: GlobMatcher,
    toc: GlobMatcher,
    payload: GlobMatcher,
}

impl ExtensionClasses {
    pub fn new() -> Self {
        Self { archive: matcher("*.pak"), toc: matcher("*.utoc"), payload: matcher("*.ucas") }
    }

    pub fn classify(&self, path: &Path) -> Option<ContainerKind> {
        let name = path.file_name()?;
        if self.archive.is_match(name) {
            Some(ContainerKind::Archive)
        } else if self.toc.is_match(name) {
            Some(ContainerKind::Toc)
        } else if self.payload.is_match(name) {
            Some(ContainerKind::Payload)
        } else {
            None
        }
    }
}

impl Default for ExtensionClasses {
    fn default() -> Self {
        Self::new()
    }
}

fn matcher(pattern: &str) -> GlobMatcher {
    // Patterns are fixed literals; building them cannot fail.
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .unwrap_or_else(|e| unreachable!("static glob {pattern}: {e}"))
}

/// Containers found under a package root, each list sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Discovery {
    pub archives: Vec<PathBuf>,
    pub tocs: Vec<PathBuf>,
    pub payloads: Vec<PathBuf>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty() && self.tocs.is_empty() && self.payloads.is_empty()
    }
}

/// Recursively list container files under `root`. Returned paths are
/// absolute when `root` is.
pub fn discover(root: &Path) -> Result<Discovery> {
    if !root.is_dir() {
        return Err(Error::InvalidInput {
            path: root.to_path_buf(),
            reason: if root.exists() { "not a directory".into() } else { "does not exist".into() },
        });
    }
    let classes = ExtensionClasses::new();
    let mut out = Discovery::default();
    for ent in WalkDir::new(root).min_depth(1) {
        let ent = ent.map_err(|e| Error::InvalidInput {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            reason: e.to_string(),
        })?;
        if !ent.file_type().is_file() {
            continue;
        }
        let bucket = match classes.classify(ent.path()) {
            Some(ContainerKind::Archive) => &mut out.archives,
            Some(ContainerKind::Toc) => &mut out.tocs,
            Some(ContainerKind::Payload) => &mut out.payloads,
            None => continue,
        };
        bucket.push(ent.into_path());
    }
    out.archives.sort();
    out.tocs.sort();
    out.payloads.sort();
    info!(
        "Found: {} pak files, {} utoc files, {} ucas files",
        out.archives.len(),
        out.tocs.len(),
        out.payloads.len()
    );
    Ok(out)
}
