#![allow(dead_code)]
//! Writers for minimal pak and utoc indices used as test fixtures.

use std::collections::HashMap;
use std::path::Path;

pub const PAK_MAGIC: u32 = 0x5A6F_12E1;
const PAYLOAD_PREFIX: usize = 16;

fn fstr(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() {
        buf.extend_from_slice(&0i32.to_le_bytes());
        return;
    }
    buf.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

fn footer_221(version: u32, index_offset: u64, index_size: u64) -> Vec<u8> {
    let mut f = Vec::with_capacity(221);
    f.extend_from_slice(&[0u8; 16]);
    f.push(0);
    f.extend_from_slice(&PAK_MAGIC.to_le_bytes());
    f.extend_from_slice(&version.to_le_bytes());
    f.extend_from_slice(&(index_offset as i64).to_le_bytes());
    f.extend_from_slice(&(index_size as i64).to_le_bytes());
    f.extend_from_slice(&[0u8; 20]);
    f.extend_from_slice(&[0u8; 160]);
    assert_eq!(f.len(), 221);
    f
}

/// Version 11 pak (path hash index + full directory index). Files are
/// `(path relative to mount, uncompressed size)`; all stored uncompressed.
pub fn pak_v11(mount: &str, files: &[(&str, u64)]) -> Vec<u8> {
    let mut encoded = Vec::new();
    let mut by_dir: Vec<(String, Vec<(String, i32)>)> = Vec::new();
    for (i, (path, size)) in files.iter().enumerate() {
        let location = encoded.len() as i32;
        let bits: u32 = (1 << 31) | (1 << 30);
        encoded.extend_from_slice(&bits.to_le_bytes());
        encoded.extend_from_slice(&((PAYLOAD_PREFIX + i * 64) as u32).to_le_bytes());
        encoded.extend_from_slice(&(*size as u32).to_le_bytes());
        let (dir, name) = match path.rfind('/') {
            Some(at) => (format!("/{}", &path[..=at]), path[at + 1..].to_string()),
            None => ("/".to_string(), path.to_string()),
        };
        match by_dir.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, v)) => v.push((name, location)),
            None => by_dir.push((dir, vec![(name, location)])),
        }
    }

    let mut fdi = Vec::new();
    fdi.extend_from_slice(&(by_dir.len() as i32).to_le_bytes());
    for (dir, entries) in &by_dir {
        fstr(&mut fdi, dir);
        fdi.extend_from_slice(&(entries.len() as i32).to_le_bytes());
        for (name, loc) in entries {
            fstr(&mut fdi, name);
            fdi.extend_from_slice(&loc.to_le_bytes());
        }
    }

    let fdi_offset = PAYLOAD_PREFIX as u64;
    let mut primary = Vec::new();
    fstr(&mut primary, mount);
    primary.extend_from_slice(&(files.len() as i32).to_le_bytes());
    primary.extend_from_slice(&0u64.to_le_bytes());
    primary.extend_from_slice(&0u32.to_le_bytes());
    primary.extend_from_slice(&1u32.to_le_bytes());
    primary.extend_from_slice(&(fdi_offset as i64).to_le_bytes());
    primary.extend_from_slice(&(fdi.len() as i64).to_le_bytes());
    primary.extend_from_slice(&[0u8; 20]);
    primary.extend_from_slice(&(encoded.len() as i32).to_le_bytes());
    primary.extend_from_slice(&encoded);
    primary.extend_from_slice(&0i32.to_le_bytes());

    let mut out = vec![0u8; PAYLOAD_PREFIX];
    out.extend_from_slice(&fdi);
    let index_offset = out.len() as u64;
    out.extend_from_slice(&primary);
    out.extend_from_slice(&footer_221(11, index_offset, primary.len() as u64));
    out
}

/// Version 8 pak with a legacy index. Files are
/// `(path, uncompressed size, stored size)`; stored != uncompressed marks
/// the entry compressed. Paths in `deleted` get a delete record.
pub fn pak_v8(mount: &str, files: &[(&str, u64, u64)], deleted: &[&str]) -> Vec<u8> {
    let mut index = Vec::new();
    fstr(&mut index, mount);
    index.extend_from_slice(&((files.len() + deleted.len()) as i32).to_le_bytes());
    let write_entry = |index: &mut Vec<u8>, name: &str, size: u64, stored: u64, flags: u8, i: usize| {
        fstr(index, name);
        index.extend_from_slice(&((PAYLOAD_PREFIX + i * 64) as i64).to_le_bytes());
        index.extend_from_slice(&(stored as i64).to_le_bytes());
        index.extend_from_slice(&(size as i64).to_le_bytes());
        let compression: u32 = if stored != size { 1 } else { 0 };
        index.extend_from_slice(&compression.to_le_bytes());
        index.extend_from_slice(&[0u8; 20]);
        if compression != 0 {
            index.extend_from_slice(&1u32.to_le_bytes());
            index.extend_from_slice(&0i64.to_le_bytes());
            index.extend_from_slice(&(stored as i64).to_le_bytes());
        }
        index.push(flags);
        index.extend_from_slice(&65536u32.to_le_bytes());
    };
    for (i, (name, size, stored)) in files.iter().enumerate() {
        write_entry(&mut index, name, *size, *stored, 0, i);
    }
    for (i, name) in deleted.iter().enumerate() {
        write_entry(&mut index, name, 0, 0, 0x02, files.len() + i);
    }

    let mut out = vec![0u8; PAYLOAD_PREFIX];
    let index_offset = out.len() as u64;
    out.extend_from_slice(&index);
    out.extend_from_slice(&footer_221(8, index_offset, index.len() as u64));
    out
}

struct Dir {
    name: u32,
    first_child: u32,
    next_sibling: u32,
    first_file: u32,
}

/// Version 5 utoc with a directory index. Files are
/// `(path relative to mount, offset, length)`.
pub fn utoc(mount: &str, files: &[(&str, u64, u64)]) -> Vec<u8> {
    const NONE: u32 = u32::MAX;
    let mut strings: Vec<String> = Vec::new();
    let intern = |s: &str, strings: &mut Vec<String>| -> u32 {
        match strings.iter().position(|x| x == s) {
            Some(i) => i as u32,
            None => {
                strings.push(s.to_string());
                (strings.len() - 1) as u32
            }
        }
    };
    let mut dirs = vec![Dir { name: NONE, first_child: NONE, next_sibling: NONE, first_file: NONE }];
    let mut dir_ids: HashMap<String, u32> = HashMap::new();
    let mut file_entries: Vec<(u32, u32, u32)> = Vec::new();
    for (i, (path, _, _)) in files.iter().enumerate() {
        let mut parts: Vec<&str> = path.split('/').collect();
        let file_name = parts.pop().unwrap();
        let mut cur = 0u32;
        let mut prefix = String::new();
        for part in parts {
            prefix.push_str(part);
            prefix.push('/');
            cur = match dir_ids.get(&prefix) {
                Some(&id) => id,
                None => {
                    let id = dirs.len() as u32;
                    let name = intern(part, &mut strings);
                    let sibling = dirs[cur as usize].first_child;
                    dirs.push(Dir { name, first_child: NONE, next_sibling: sibling, first_file: NONE });
                    dirs[cur as usize].first_child = id;
                    dir_ids.insert(prefix.clone(), id);
                    id
                }
            };
        }
        let name = intern(file_name, &mut strings);
        let fid = file_entries.len() as u32;
        file_entries.push((name, dirs[cur as usize].first_file, i as u32));
        dirs[cur as usize].first_file = fid;
    }

    let mut dir_index = Vec::new();
    fstr(&mut dir_index, mount);
    dir_index.extend_from_slice(&(dirs.len() as i32).to_le_bytes());
    for d in &dirs {
        for v in [d.name, d.first_child, d.next_sibling, d.first_file] {
            dir_index.extend_from_slice(&v.to_le_bytes());
        }
    }
    dir_index.extend_from_slice(&(file_entries.len() as i32).to_le_bytes());
    for (name, next, user) in &file_entries {
        for v in [*name, *next, *user] {
            dir_index.extend_from_slice(&v.to_le_bytes());
        }
    }
    dir_index.extend_from_slice(&(strings.len() as i32).to_le_bytes());
    for s in &strings {
        fstr(&mut dir_index, s);
    }

    let n = files.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(b"-==--==--==--==-");
    out.push(5);
    out.extend_from_slice(&[0u8; 3]);
    for v in [144u32, n, 0, 12, 0, 32, 0x10000, dir_index.len() as u32, 1] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out.push(1 << 3);
    out.extend_from_slice(&[0u8; 3]);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&u64::MAX.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 40]);
    assert_eq!(out.len(), 144);

    out.extend(std::iter::repeat(0u8).take(files.len() * 12));
    for (_, offset, length) in files {
        out.extend_from_slice(&offset.to_be_bytes()[3..8]);
        out.extend_from_slice(&length.to_be_bytes()[3..8]);
    }
    out.extend_from_slice(&dir_index);
    out
}

pub fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}
