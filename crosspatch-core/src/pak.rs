//! Index reader for monolithic `.pak` archives.
//!
//! Only the footer, the primary index and (v10+) the full directory index are
//! read. Payloads are never touched.

use crate::binary::{join_virtual, normalize_mount_point, ByteReader};
use crate::error::ArchiveError;
use crate::provider::IndexLimits;

pub const PAK_MAGIC: u32 = 0x5A6F_12E1;

const VERSION_NO_TIMESTAMPS: u32 = 2;
const VERSION_COMPRESSION_ENCRYPTION: u32 = 3;
const VERSION_FNAME_COMPRESSION: u32 = 8;
const VERSION_PATH_HASH_INDEX: u32 = 10;

const ENTRY_FLAG_DELETED: u8 = 0x02;

/// Footer layouts, largest first: (footer len, magic offset in footer,
/// versions using that layout, compression index stored as u8).
const FOOTER_LAYOUTS: [(usize, usize, &[u32], bool); 6] = [
    (222, 17, &[9], false),
    (221, 17, &[8, 10, 11], false),
    (189, 17, &[8], true),
    (61, 17, &[7], false),
    (45, 1, &[4, 5, 6], false),
    (44, 0, &[1, 2, 3], false),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PakFooter {
    pub version: u32,
    pub encrypted_index: bool,
    pub index_offset: u64,
    pub index_size: u64,
    compression_u8: bool,
}

/// Locate and decode the footer at EOF.
pub fn read_footer(data: &[u8]) -> Result<PakFooter, ArchiveError> {
    let mut seen_version = None;
    for (footer_len, magic_at, versions, compression_u8) in FOOTER_LAYOUTS {
        if data.len() < footer_len {
            continue;
        }
        let start = data.len() - footer_len;
        let mut r = ByteReader::at(data, start + magic_at)?;
        if r.u32("footer magic")? != PAK_MAGIC {
            continue;
        }
        let version = r.u32("footer version")?;
        if !versions.contains(&version) {
            seen_version = Some(version);
            continue;
        }
        let index_offset = r.i64_unsigned("index offset")?;
        let index_size = r.i64_unsigned("index size")?;
        let encrypted_index = magic_at > 0 && data[start + magic_at - 1] != 0;
        return Ok(PakFooter { version, encrypted_index, index_offset, index_size, compression_u8 });
    }
    match seen_version {
        Some(v) => Err(ArchiveError::UnsupportedVersion(v)),
        None => Err(ArchiveError::BadMagic),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PakEntryInfo {
    pub offset: u64,
    /// Stored (compressed) size.
    pub size: u64,
    pub uncompressed_size: u64,
    pub compression_method: u32,
    pub deleted: bool,
}

/// Where an entry's record lives; encoded records are decoded on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PakSlot {
    Inline(PakEntryInfo),
    Encoded(u32),
    NonEncoded(usize),
}

#[derive(Debug)]
pub struct PakIndex {
    pub version: u32,
    pub mount_point: String,
    /// Full virtual paths, in index order.
    pub entries: Vec<(String, PakSlot)>,
    /// Entries the primary index counts but no directory index names.
    pub unnamed_entries: usize,
    encoded: Vec<u8>,
    non_encoded: Vec<PakEntryInfo>,
}

impl PakIndex {
    pub fn read(data: &[u8], limits: &IndexLimits) -> Result<Self, ArchiveError> {
        let footer = read_footer(data)?;
        if footer.encrypted_index {
            return Err(ArchiveError::Encrypted);
        }
        let idx = slice_checked(data, footer.index_offset, footer.index_size, "index", limits)?;
        let mut r = ByteReader::new(idx);
        let mount_point = normalize_mount_point(&r.fstring("mount point")?);
        let declared = r.i32("entry count")?;
        let declared = usize::try_from(declared)
            .map_err(|_| ArchiveError::Malformed(format!("negative entry count {declared}")))?;
        if declared > limits.max_entries {
            return Err(ArchiveError::LimitExceeded {
                what: "entry count",
                got: declared as u64,
                limit: limits.max_entries as u64,
            });
        }

        if footer.version < VERSION_PATH_HASH_INDEX {
            let mut entries = Vec::with_capacity(declared.min(r.remaining() / 4));
            for _ in 0..declared {
                let name = r.fstring("entry name")?;
                let info = read_entry(&mut r, &footer)?;
                if info.deleted {
                    continue;
                }
                entries.push((join_virtual(&mount_point, &name), PakSlot::Inline(info)));
            }
            return Ok(Self {
                version: footer.version,
                mount_point,
                entries,
                unnamed_entries: 0,
                encoded: Vec::new(),
                non_encoded: Vec::new(),
            });
        }

        let _path_hash_seed = r.u64("path hash seed")?;
        if r.bool32("has path hash index")? {
            r.skip(8 + 8 + 20, "path hash index locator")?;
        }
        let full_dir = if r.bool32("has full directory index")? {
            let off = r.i64_unsigned("directory index offset")?;
            let size = r.i64_unsigned("directory index size")?;
            r.skip(20, "directory index hash")?;
            Some((off, size))
        } else {
            None
        };
        let encoded_len = r.count(1, "encoded entries")?;
        let encoded = r.bytes(encoded_len, "encoded entries")?.to_vec();
        let non_encoded_count = r.count(1, "non-encoded entries")?;
        let mut non_encoded = Vec::with_capacity(non_encoded_count.min(r.remaining() / 4));
        for _ in 0..non_encoded_count {
            non_encoded.push(read_entry(&mut r, &footer)?);
        }

        let Some((dir_off, dir_size)) = full_dir else {
            return Ok(Self {
                version: footer.version,
                mount_point,
                entries: Vec::new(),
                unnamed_entries: declared,
                encoded,
                non_encoded,
            });
        };

        let dir_data = slice_checked(data, dir_off, dir_size, "directory index", limits)?;
        let mut r = ByteReader::new(dir_data);
        let mut entries = Vec::with_capacity(declared.min(dir_data.len() / 8));
        let dir_count = r.count(8, "directories")?;
        for _ in 0..dir_count {
            let dir = r.fstring("directory name")?;
            let dir = dir.trim_start_matches('/');
            let file_count = r.count(8, "directory files")?;
            for _ in 0..file_count {
                let name = r.fstring("file name")?;
                let location = r.i32("entry location")?;
                let slot = match location {
                    i32::MIN => continue,
                    loc if loc >= 0 => PakSlot::Encoded(loc as u32),
                    loc => PakSlot::NonEncoded((-(loc + 1)) as usize),
                };
                let path = join_virtual(&mount_point, &format!("{dir}{name}"));
                entries.push((path, slot));
                if entries.len() > limits.max_entries {
                    return Err(ArchiveError::LimitExceeded {
                        what: "directory entries",
                        got: entries.len() as u64,
                        limit: limits.max_entries as u64,
                    });
                }
            }
        }
        let unnamed_entries = declared.saturating_sub(entries.len());
        Ok(Self { version: footer.version, mount_point, entries, unnamed_entries, encoded, non_encoded })
    }

    pub fn resolve(&self, slot: &PakSlot) -> Result<PakEntryInfo, ArchiveError> {
        match *slot {
            PakSlot::Inline(info) => Ok(info),
            PakSlot::Encoded(at) => decode_entry(&self.encoded, at),
            PakSlot::NonEncoded(i) => self.non_encoded.get(i).copied().ok_or_else(|| {
                ArchiveError::Malformed(format!(
                    "non-encoded entry {i} out of range ({})",
                    self.non_encoded.len()
                ))
            }),
        }
    }
}

fn slice_checked<'a>(
    data: &'a [u8],
    off: u64,
    len: u64,
    what: &'static str,
    limits: &IndexLimits,
) -> Result<&'a [u8], ArchiveError> {
    if len > limits.max_index_bytes {
        return Err(ArchiveError::LimitExceeded { what, got: len, limit: limits.max_index_bytes });
    }
    let end = off.checked_add(len).ok_or(ArchiveError::Truncated(what))?;
    if end > data.len() as u64 {
        return Err(ArchiveError::Truncated(what));
    }
    Ok(&data[off as usize..end as usize])
}

/// Full (non-encoded) entry record as stored in legacy indices.
fn read_entry(r: &mut ByteReader<'_>, footer: &PakFooter) -> Result<PakEntryInfo, ArchiveError> {
    let offset = r.i64_unsigned("entry offset")?;
    let size = r.i64_unsigned("entry size")?;
    let uncompressed_size = r.i64_unsigned("entry uncompressed size")?;
    let compression_method = if footer.version < VERSION_FNAME_COMPRESSION {
        r.u32("compression flags")?
    } else if footer.compression_u8 {
        u32::from(r.u8("compression index")?)
    } else {
        r.u32("compression index")?
    };
    if footer.version < VERSION_NO_TIMESTAMPS {
        r.u64("timestamp")?;
    }
    r.skip(20, "entry hash")?;
    let mut flags = 0u8;
    if footer.version >= VERSION_COMPRESSION_ENCRYPTION {
        if compression_method != 0 {
            let blocks = r.u32("compression block count")?;
            r.skip(u64::from(blocks) * 16, "compression blocks")?;
        }
        flags = r.u8("entry flags")?;
        r.u32("compression block size")?;
    }
    Ok(PakEntryInfo {
        offset,
        size,
        uncompressed_size,
        compression_method,
        deleted: flags & ENTRY_FLAG_DELETED != 0,
    })
}

/// Bit-packed entry record used by path-hash indices (v10+).
fn decode_entry(encoded: &[u8], at: u32) -> Result<PakEntryInfo, ArchiveError> {
    let mut r = ByteReader::at(encoded, at as usize)?;
    let bits = r.u32("encoded entry")?;
    if bits & 0x3f == 0x3f {
        r.u32("compression block size")?;
    }
    let compression_method = (bits >> 23) & 0x3f;
    let offset = if bits & (1 << 31) != 0 {
        u64::from(r.u32("entry offset")?)
    } else {
        r.i64_unsigned("entry offset")?
    };
    let uncompressed_size = if bits & (1 << 30) != 0 {
        u64::from(r.u32("entry uncompressed size")?)
    } else {
        r.i64_unsigned("entry uncompressed size")?
    };
    let size = if compression_method != 0 {
        if bits & (1 << 29) != 0 {
            u64::from(r.u32("entry size")?)
        } else {
            r.i64_unsigned("entry size")?
        }
    } else {
        uncompressed_size
    };
    Ok(PakEntryInfo {
        offset,
        size,
        uncompressed_size,
        compression_method,
        deleted: false,
    })
}
