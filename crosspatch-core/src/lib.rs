//! Builds the `info.json`-style manifest for a pak-based mod: discovers
//! `.pak` archives and `.utoc`/`.ucas` IoStore pairs under a directory,
//! indexes their entries through an [`provider::ArchiveProvider`], and
//! assembles a [`manifest::ModManifest`].

mod binary;
pub mod catalog;
pub mod correlate;
pub mod discover;
pub mod error;
pub mod iostore;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod pak;
pub mod pipeline;
pub mod provider;

pub use error::{Error, Result};
pub use manifest::{ModIdentity, ModManifest};
pub use pipeline::{build_manifest, build_manifest_with, BuildConfig};
