//! Pairing of IoStore `.utoc` files with their `.ucas` payloads.
//!
//! Pairing runs as one pass over the discovered lists and yields an immutable
//! list, so metadata building never mutates shared "already seen" state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// One logical split container. `tocs` holds every toc sharing the base
/// name in discovery order; the first one is preferred and the rest are
/// fallbacks if its record cannot be built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerPair {
    pub base_name: String,
    pub tocs: Vec<PathBuf>,
    pub payload: PathBuf,
}

/// File name without its last extension (`a/Foo.utoc` -> `Foo`).
pub fn base_name(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Match tocs to payloads by exact, case-sensitive base name. Each base
/// name yields at most one pair; a toc without a payload is dropped.
pub fn correlate(tocs: &[PathBuf], payloads: &[PathBuf]) -> Vec<ContainerPair> {
    let mut pairs: Vec<ContainerPair> = Vec::new();
    let mut by_base: HashMap<String, usize> = HashMap::new();
    for toc in tocs {
        let Some(base) = base_name(toc) else {
            continue;
        };
        if let Some(&i) = by_base.get(&base) {
            pairs[i].tocs.push(toc.clone());
            continue;
        }
        let payload = payloads.iter().find(|p| base_name(p).as_deref() == Some(base.as_str()));
        let Some(payload) = payload else {
            debug!("no payload for {}, skipping", toc.display());
            continue;
        };
        by_base.insert(base.clone(), pairs.len());
        pairs.push(ContainerPair { base_name: base, tocs: vec![toc.clone()], payload: payload.clone() });
    }
    pairs
}
