//! Index reader for IoStore table-of-contents (`.utoc`) files.
//!
//! The toc carries the chunk offset/length table and, when the container is
//! indexed, a directory tree naming each chunk. The `.ucas` payload is only
//! checked for presence by the provider.

use crate::binary::{join_virtual, normalize_mount_point, ByteReader};
use crate::error::ArchiveError;
use crate::provider::IndexLimits;

pub const TOC_MAGIC: &[u8; 16] = b"-==--==--==--==-";
const TOC_HEADER_LEN: usize = 144;
const MAX_TOC_VERSION: u8 = 8;
const VERSION_PERFECT_HASH: u8 = 4;
const VERSION_PERFECT_HASH_WITH_OVERFLOW: u8 = 5;

const FLAG_ENCRYPTED: u8 = 1 << 1;
const FLAG_SIGNED: u8 = 1 << 2;
const FLAG_INDEXED: u8 = 1 << 3;

const INVALID: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TocHeader {
    pub version: u8,
    pub header_size: u32,
    pub entry_count: u32,
    pub compressed_block_count: u32,
    pub compressed_block_entry_size: u32,
    pub compression_method_count: u32,
    pub compression_method_len: u32,
    pub directory_index_size: u32,
    pub flags: u8,
    pub perfect_hash_seeds: u32,
    pub chunks_without_perfect_hash: u32,
}

impl TocHeader {
    pub fn read(data: &[u8]) -> Result<Self, ArchiveError> {
        let mut r = ByteReader::new(data);
        if r.bytes(16, "toc magic")? != TOC_MAGIC {
            return Err(ArchiveError::BadMagic);
        }
        let version = r.u8("toc version")?;
        if version == 0 || version > MAX_TOC_VERSION {
            return Err(ArchiveError::UnsupportedVersion(u32::from(version)));
        }
        r.skip(3, "toc reserved")?;
        let header_size = r.u32("toc header size")?;
        let entry_count = r.u32("toc entry count")?;
        let compressed_block_count = r.u32("compressed block count")?;
        let compressed_block_entry_size = r.u32("compressed block entry size")?;
        let compression_method_count = r.u32("compression method count")?;
        let compression_method_len = r.u32("compression method length")?;
        let _compression_block_size = r.u32("compression block size")?;
        let directory_index_size = r.u32("directory index size")?;
        let _partition_count = r.u32("partition count")?;
        let _container_id = r.u64("container id")?;
        r.skip(16, "encryption key guid")?;
        let flags = r.u8("container flags")?;
        r.skip(3, "toc reserved")?;
        let perfect_hash_seeds = r.u32("perfect hash seed count")?;
        let _partition_size = r.u64("partition size")?;
        let chunks_without_perfect_hash = r.u32("chunks without perfect hash")?;
        Ok(Self {
            version,
            header_size,
            entry_count,
            compressed_block_count,
            compressed_block_entry_size,
            compression_method_count,
            compression_method_len,
            directory_index_size,
            flags,
            perfect_hash_seeds,
            chunks_without_perfect_hash,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn is_indexed(&self) -> bool {
        self.flags & FLAG_INDEXED != 0
    }
}

/// Chunk location within the uncompressed payload space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkOffsetLength {
    pub offset: u64,
    pub length: u64,
}

impl ChunkOffsetLength {
    /// Two 40-bit big-endian integers.
    fn parse(raw: &[u8]) -> Self {
        let be40 = |b: &[u8]| b.iter().fold(0u64, |acc, &x| (acc << 8) | u64::from(x));
        Self { offset: be40(&raw[0..5]), length: be40(&raw[5..10]) }
    }
}

#[derive(Debug)]
pub struct TocIndex {
    pub header: TocHeader,
    pub mount_point: String,
    /// Full virtual path and toc entry index, in directory-walk order.
    pub entries: Vec<(String, u32)>,
    chunks: Vec<ChunkOffsetLength>,
}

impl TocIndex {
    pub fn read(data: &[u8], limits: &IndexLimits) -> Result<Self, ArchiveError> {
        let header = TocHeader::read(data)?;
        if data.len() as u64 > limits.max_index_bytes {
            return Err(ArchiveError::LimitExceeded {
                what: "toc",
                got: data.len() as u64,
                limit: limits.max_index_bytes,
            });
        }
        if header.entry_count as usize > limits.max_entries {
            return Err(ArchiveError::LimitExceeded {
                what: "toc entry count",
                got: u64::from(header.entry_count),
                limit: limits.max_entries as u64,
            });
        }
        let start = (header.header_size as usize).max(TOC_HEADER_LEN);
        let mut r = ByteReader::at(data, start)?;
        let entries = u64::from(header.entry_count);
        r.skip(entries * 12, "chunk ids")?;
        let raw_chunks = r.bytes(header.entry_count as usize * 10, "chunk offsets")?;
        let chunks = raw_chunks.chunks_exact(10).map(ChunkOffsetLength::parse).collect();
        if header.version >= VERSION_PERFECT_HASH {
            r.skip(u64::from(header.perfect_hash_seeds) * 4, "perfect hash seeds")?;
        }
        if header.version >= VERSION_PERFECT_HASH_WITH_OVERFLOW {
            r.skip(u64::from(header.chunks_without_perfect_hash) * 4, "chunks without perfect hash")?;
        }
        let blocks = u64::from(header.compressed_block_count);
        r.skip(blocks * u64::from(header.compressed_block_entry_size), "compression blocks")?;
        r.skip(
            u64::from(header.compression_method_count) * u64::from(header.compression_method_len),
            "compression methods",
        )?;
        if header.flags & FLAG_SIGNED != 0 {
            let hash_size = r.i32("signature size")?;
            let hash_size = u64::try_from(hash_size)
                .map_err(|_| ArchiveError::Malformed(format!("negative signature size {hash_size}")))?;
            r.skip(hash_size * 2, "signatures")?;
            r.skip(blocks * 20, "block signatures")?;
        }

        if !header.is_indexed() || header.directory_index_size == 0 {
            return Ok(Self { header, mount_point: String::new(), entries: Vec::new(), chunks });
        }
        if header.is_encrypted() {
            return Err(ArchiveError::Encrypted);
        }
        let dir = r.bytes(header.directory_index_size as usize, "directory index")?;
        let (mount_point, entries) = read_directory_index(dir, limits)?;
        Ok(Self { header, mount_point, entries, chunks })
    }

    pub fn chunk(&self, toc_index: u32) -> Result<ChunkOffsetLength, ArchiveError> {
        self.chunks.get(toc_index as usize).copied().ok_or_else(|| {
            ArchiveError::Malformed(format!(
                "toc entry {toc_index} out of range ({})",
                self.chunks.len()
            ))
        })
    }
}

struct DirEntry {
    name: u32,
    first_child: u32,
    next_sibling: u32,
    first_file: u32,
}

struct FileEntry {
    name: u32,
    next_file: u32,
    user_data: u32,
}

fn read_directory_index(
    data: &[u8],
    limits: &IndexLimits,
) -> Result<(String, Vec<(String, u32)>), ArchiveError> {
    let mut r = ByteReader::new(data);
    let mount_point = normalize_mount_point(&r.fstring("directory mount point")?);
    let n = r.count(16, "directory entries")?;
    let mut dirs = Vec::with_capacity(n);
    for _ in 0..n {
        dirs.push(DirEntry {
            name: r.u32("dir name")?,
            first_child: r.u32("dir first child")?,
            next_sibling: r.u32("dir next sibling")?,
            first_file: r.u32("dir first file")?,
        });
    }
    let n = r.count(12, "file entries")?;
    let mut files = Vec::with_capacity(n);
    for _ in 0..n {
        files.push(FileEntry {
            name: r.u32("file name")?,
            next_file: r.u32("file next")?,
            user_data: r.u32("file user data")?,
        });
    }
    let n = r.count(4, "string table")?;
    let mut strings = Vec::with_capacity(n);
    for _ in 0..n {
        strings.push(r.fstring("string table entry")?);
    }

    let name_of = |idx: u32| -> Result<&str, ArchiveError> {
        strings
            .get(idx as usize)
            .map(String::as_str)
            .ok_or_else(|| ArchiveError::Malformed(format!("name index {idx} out of range")))
    };
    let mut out = Vec::new();
    if dirs.is_empty() {
        return Ok((mount_point, out));
    }
    // Each directory and file is visited at most once in a well-formed tree.
    let budget = dirs.len() + files.len();
    let mut steps = 0usize;
    let mut stack = vec![(0u32, String::new())];
    while let Some((d, prefix)) = stack.pop() {
        let dir = dirs
            .get(d as usize)
            .ok_or_else(|| ArchiveError::Malformed(format!("directory {d} out of range")))?;
        let mut f = dir.first_file;
        while f != INVALID {
            steps += 1;
            if steps > budget {
                return Err(ArchiveError::Malformed("cycle in directory index".into()));
            }
            let file = files
                .get(f as usize)
                .ok_or_else(|| ArchiveError::Malformed(format!("file {f} out of range")))?;
            let path = join_virtual(&mount_point, &format!("{prefix}{}", name_of(file.name)?));
            out.push((path, file.user_data));
            if out.len() > limits.max_entries {
                return Err(ArchiveError::LimitExceeded {
                    what: "directory entries",
                    got: out.len() as u64,
                    limit: limits.max_entries as u64,
                });
            }
            f = file.next_file;
        }
        let mut children = Vec::new();
        let mut c = dir.first_child;
        while c != INVALID {
            steps += 1;
            if steps > budget {
                return Err(ArchiveError::Malformed("cycle in directory index".into()));
            }
            let child = dirs
                .get(c as usize)
                .ok_or_else(|| ArchiveError::Malformed(format!("directory {c} out of range")))?;
            children.push((c, format!("{prefix}{}/", name_of(child.name)?)));
            c = child.next_sibling;
        }
        // Reverse so siblings pop in stored order.
        stack.extend(children.into_iter().rev());
    }
    Ok((mount_point, out))
}
