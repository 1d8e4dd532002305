//! Archive provider: the mounted, indexed view of every container under a
//! package root.
//!
//! The pipeline only talks to [`ArchiveProvider`] and [`EntryRecord`]. The
//! built-in [`FileProvider`] mounts `.pak` archives and `.utoc`/`.ucas`
//! containers found on disk; tests substitute in-memory providers.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::discover::{ContainerKind, ExtensionClasses};
use crate::error::{ArchiveError, EntryIntrospectionError, ProviderInitError};
use crate::iostore::TocIndex;
use crate::metadata::relative_to_root;
use crate::pak::{PakEntryInfo, PakIndex, PakSlot};

#[derive(Clone, Copy, Debug)]
pub struct IndexLimits {
    pub max_index_bytes: u64,
    pub max_entries: usize,
}

impl Default for IndexLimits {
    fn default() -> Self {
        Self { max_index_bytes: 256 * 1024 * 1024, max_entries: 5_000_000 }
    }
}

/// Optional metadata an entry may expose. Entry shapes differ per container
/// type, so every accessor may legitimately return `None`.
pub trait EntryRecord {
    fn size(&self) -> Option<u64> {
        None
    }
    fn compressed_size(&self) -> Option<u64> {
        None
    }
    fn offset(&self) -> Option<u64> {
        None
    }
    fn archive_name(&self) -> Option<&str> {
        None
    }
    /// Root-relative path of the container the entry was read from. Unlike
    /// [`archive_name`](Self::archive_name) this tells apart containers that
    /// share a file name in different directories.
    fn container_path(&self) -> Option<&str> {
        None
    }
}

pub trait ArchiveProvider {
    type Entry: EntryRecord;

    /// Every mounted path, in a stable order.
    fn paths(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    /// Resolve the record behind `path`.
    fn entry(&self, path: &str) -> Result<Self::Entry, EntryIntrospectionError>;

    fn file_count(&self) -> usize {
        self.paths().count()
    }
}

/// A mounted container as seen from its entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerId {
    pub file_name: String,
    /// Relative to the provider root, forward slashes.
    pub rel_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PakFileEntry {
    pub info: PakEntryInfo,
    pub container: Arc<ContainerId>,
}

impl EntryRecord for PakFileEntry {
    fn size(&self) -> Option<u64> {
        Some(self.info.uncompressed_size)
    }
    fn compressed_size(&self) -> Option<u64> {
        Some(self.info.size)
    }
    fn offset(&self) -> Option<u64> {
        Some(self.info.offset)
    }
    fn archive_name(&self) -> Option<&str> {
        Some(&self.container.file_name)
    }
    fn container_path(&self) -> Option<&str> {
        Some(&self.container.rel_path)
    }
}

/// IoStore chunks carry no per-entry compressed size in the toc.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoStoreFileEntry {
    pub offset: u64,
    pub size: u64,
    pub container: Arc<ContainerId>,
}

impl EntryRecord for IoStoreFileEntry {
    fn size(&self) -> Option<u64> {
        Some(self.size)
    }
    fn offset(&self) -> Option<u64> {
        Some(self.offset)
    }
    fn archive_name(&self) -> Option<&str> {
        Some(&self.container.file_name)
    }
    fn container_path(&self) -> Option<&str> {
        Some(&self.container.rel_path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameFile {
    Pak(PakFileEntry),
    IoStore(IoStoreFileEntry),
}

impl EntryRecord for GameFile {
    fn size(&self) -> Option<u64> {
        match self {
            GameFile::Pak(e) => e.size(),
            GameFile::IoStore(e) => e.size(),
        }
    }
    fn compressed_size(&self) -> Option<u64> {
        match self {
            GameFile::Pak(e) => e.compressed_size(),
            GameFile::IoStore(e) => e.compressed_size(),
        }
    }
    fn offset(&self) -> Option<u64> {
        match self {
            GameFile::Pak(e) => e.offset(),
            GameFile::IoStore(e) => e.offset(),
        }
    }
    fn archive_name(&self) -> Option<&str> {
        match self {
            GameFile::Pak(e) => e.archive_name(),
            GameFile::IoStore(e) => e.archive_name(),
        }
    }
    fn container_path(&self) -> Option<&str> {
        match self {
            GameFile::Pak(e) => e.container_path(),
            GameFile::IoStore(e) => e.container_path(),
        }
    }
}

enum MountedIndex {
    Pak(PakIndex),
    IoStore(TocIndex),
}

struct Mounted {
    container: Arc<ContainerId>,
    index: MountedIndex,
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    Pak(PakSlot),
    Toc(u32),
}

/// Provider over `.pak` and `.utoc`/`.ucas` files on disk.
pub struct FileProvider {
    root: PathBuf,
    mounted: Vec<Mounted>,
    files: BTreeMap<String, (usize, Slot)>,
    skipped: Vec<(PathBuf, ArchiveError)>,
}

impl FileProvider {
    /// Walk `root` and mount every container found, in sorted path order.
    /// A container that fails to mount is logged and left out.
    pub fn initialize(root: &Path, limits: &IndexLimits) -> Result<Self, ProviderInitError> {
        if !root.is_dir() {
            return Err(ProviderInitError::NotADirectory(root.to_path_buf()));
        }
        info!("Initializing provider for path: {}", root.display());
        let classes = ExtensionClasses::new();
        let mut containers = Vec::new();
        for ent in WalkDir::new(root).min_depth(1) {
            let ent = ent?;
            if !ent.file_type().is_file() {
                continue;
            }
            match classes.classify(ent.path()) {
                Some(kind @ (ContainerKind::Archive | ContainerKind::Toc)) => {
                    containers.push((ent.into_path(), kind))
                }
                _ => {}
            }
        }
        containers.sort_by(|a, b| a.0.cmp(&b.0));

        let mut provider = Self {
            root: root.to_path_buf(),
            mounted: Vec::new(),
            files: BTreeMap::new(),
            skipped: Vec::new(),
        };
        for (path, kind) in containers {
            if let Err(e) = provider.mount(&path, kind, limits) {
                warn!("could not mount {}: {}", path.display(), e);
                provider.skipped.push((path, e));
            }
        }
        info!(
            "Mounted {} container(s), {} file(s)",
            provider.mounted.len(),
            provider.files.len()
        );
        Ok(provider)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// Containers that were found but could not be mounted.
    pub fn skipped(&self) -> &[(PathBuf, ArchiveError)] {
        &self.skipped
    }

    fn mount(&mut self, path: &Path, kind: ContainerKind, limits: &IndexLimits) -> Result<(), ArchiveError> {
        let container = Arc::new(ContainerId {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            rel_path: relative_to_root(&self.root, path)
                .map_err(|e| ArchiveError::Malformed(e.to_string()))?,
        });
        let map = map_file(path)?;
        let (index, slots): (MountedIndex, Vec<(String, Slot)>) = match kind {
            ContainerKind::Toc => {
                let ucas = path.with_extension("ucas");
                if !ucas.is_file() {
                    return Err(ArchiveError::MissingPayload(ucas));
                }
                let mut toc = TocIndex::read(&map, limits)?;
                let slots = std::mem::take(&mut toc.entries)
                    .into_iter()
                    .map(|(p, i)| (p, Slot::Toc(i)))
                    .collect();
                (MountedIndex::IoStore(toc), slots)
            }
            _ => {
                let mut pak = PakIndex::read(&map, limits)?;
                if pak.unnamed_entries > 0 {
                    warn!(
                        "{} has {} entries without a directory index; they are not listed",
                        path.display(),
                        pak.unnamed_entries
                    );
                }
                let slots = std::mem::take(&mut pak.entries)
                    .into_iter()
                    .map(|(p, s)| (p, Slot::Pak(s)))
                    .collect();
                (MountedIndex::Pak(pak), slots)
            }
        };
        let id = self.mounted.len();
        debug!("mounted {} ({} entries)", path.display(), slots.len());
        self.mounted.push(Mounted { container, index });
        for (p, slot) in slots {
            // Later containers shadow earlier ones for the same path.
            self.files.insert(p, (id, slot));
        }
        Ok(())
    }
}

impl ArchiveProvider for FileProvider {
    type Entry = GameFile;

    fn paths(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.files.keys().map(String::as_str))
    }

    fn entry(&self, path: &str) -> Result<GameFile, EntryIntrospectionError> {
        let fail = |reason: String| EntryIntrospectionError { path: path.to_string(), reason };
        let &(id, slot) = self.files.get(path).ok_or_else(|| fail("not mounted".into()))?;
        let mounted = &self.mounted[id];
        match (&mounted.index, slot) {
            (MountedIndex::Pak(pak), Slot::Pak(slot)) => {
                let info = pak.resolve(&slot).map_err(|e| fail(e.to_string()))?;
                Ok(GameFile::Pak(PakFileEntry { info, container: mounted.container.clone() }))
            }
            (MountedIndex::IoStore(toc), Slot::Toc(i)) => {
                let chunk = toc.chunk(i).map_err(|e| fail(e.to_string()))?;
                Ok(GameFile::IoStore(IoStoreFileEntry {
                    offset: chunk.offset,
                    size: chunk.length,
                    container: mounted.container.clone(),
                }))
            }
            _ => Err(fail("slot does not match container kind".into())),
        }
    }

    fn file_count(&self) -> usize {
        self.files.len()
    }
}

fn map_file(path: &Path) -> Result<Mmap, ArchiveError> {
    let f = File::open(path)?;
    if f.metadata()?.len() == 0 {
        return Err(ArchiveError::Truncated("empty file"));
    }
    // Read-only map; the index is copied out before the map is dropped.
    let map = unsafe { Mmap::map(&f)? };
    Ok(map)
}
