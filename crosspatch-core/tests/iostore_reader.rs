mod common;

use crosspatch_core::error::ArchiveError;
use crosspatch_core::iostore::TocIndex;
use crosspatch_core::provider::{ArchiveProvider, EntryRecord, FileProvider, IndexLimits};

#[test]
fn directory_index_yields_full_paths() {
    let data = common::utoc(
        "../../../",
        &[
            ("Game/Content/Hero/Mesh.uasset", 0, 4096),
            ("Game/Content/Hero/Tex.uasset", 4096, 1024),
            ("Game/Content/Map.umap", 8192, 77),
        ],
    );
    let toc = TocIndex::read(&data, &IndexLimits::default()).unwrap();
    assert_eq!(toc.header.version, 5);
    assert_eq!(toc.header.entry_count, 3);
    assert_eq!(toc.mount_point, "");

    let mut entries = toc.entries.clone();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            ("Game/Content/Hero/Mesh.uasset".to_string(), 0),
            ("Game/Content/Hero/Tex.uasset".to_string(), 1),
            ("Game/Content/Map.umap".to_string(), 2),
        ]
    );
    let c = toc.chunk(1).unwrap();
    assert_eq!((c.offset, c.length), (4096, 1024));
    assert!(toc.chunk(3).is_err());
}

#[test]
fn truncated_toc_is_an_error() {
    let data = common::utoc("", &[("a.uasset", 0, 1)]);
    let err = TocIndex::read(&data[..data.len() - 5], &IndexLimits::default()).unwrap_err();
    assert!(matches!(err, ArchiveError::Truncated(_)), "{err}");
}

#[test]
fn provider_needs_the_payload_next_to_the_toc() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path();
    common::write(&root.join("Paired.utoc"), &common::utoc("", &[("Game/p.uasset", 0, 10)]));
    common::write(&root.join("Paired.ucas"), b"");
    common::write(&root.join("Alone.utoc"), &common::utoc("", &[("Game/a.uasset", 0, 10)]));

    let provider = FileProvider::initialize(root, &IndexLimits::default()).unwrap();
    assert_eq!(provider.mounted_count(), 1);
    assert!(matches!(provider.skipped()[0].1, ArchiveError::MissingPayload(_)));

    let paths: Vec<&str> = provider.paths().collect();
    assert_eq!(paths, vec!["Game/p.uasset"]);
    let e = provider.entry("Game/p.uasset").unwrap();
    assert_eq!(e.size(), Some(10));
    assert_eq!(e.offset(), Some(0));
    assert_eq!(e.compressed_size(), None);
    assert_eq!(e.archive_name(), Some("Paired.utoc"));
}
