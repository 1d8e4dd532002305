#![allow(dead_code)]
//! Small container writers for end-to-end runs.

use std::path::Path;

fn fstr(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

/// Version 8 pak with a legacy index; every entry stored uncompressed.
pub fn pak(mount: &str, files: &[(&str, u64)]) -> Vec<u8> {
    let mut index = Vec::new();
    fstr(&mut index, mount);
    index.extend_from_slice(&(files.len() as i32).to_le_bytes());
    for (i, (name, size)) in files.iter().enumerate() {
        fstr(&mut index, name);
        index.extend_from_slice(&(i as i64 * 64).to_le_bytes());
        index.extend_from_slice(&(*size as i64).to_le_bytes());
        index.extend_from_slice(&(*size as i64).to_le_bytes());
        index.extend_from_slice(&0u32.to_le_bytes());
        index.extend_from_slice(&[0u8; 20]);
        index.push(0);
        index.extend_from_slice(&0u32.to_le_bytes());
    }

    let mut out = index.clone();
    out.extend_from_slice(&[0u8; 17]);
    out.extend_from_slice(&0x5A6F_12E1u32.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&0i64.to_le_bytes());
    out.extend_from_slice(&(index.len() as i64).to_le_bytes());
    out.extend_from_slice(&[0u8; 20 + 160]);
    out
}

/// Version 5 utoc whose files all hang off the root directory entry, so
/// a name like `Game/a.uasset` comes back as that full path.
pub fn utoc(files: &[(&str, u64, u64)]) -> Vec<u8> {
    const NONE: u32 = u32::MAX;
    let n = files.len() as u32;

    let mut dir_index = Vec::new();
    dir_index.extend_from_slice(&0i32.to_le_bytes());
    dir_index.extend_from_slice(&1i32.to_le_bytes());
    let first_file = if files.is_empty() { NONE } else { 0 };
    for v in [NONE, NONE, NONE, first_file] {
        dir_index.extend_from_slice(&v.to_le_bytes());
    }
    dir_index.extend_from_slice(&(n as i32).to_le_bytes());
    for i in 0..n {
        let next = if i + 1 < n { i + 1 } else { NONE };
        for v in [i, next, i] {
            dir_index.extend_from_slice(&v.to_le_bytes());
        }
    }
    dir_index.extend_from_slice(&(n as i32).to_le_bytes());
    for (name, _, _) in files {
        fstr(&mut dir_index, name);
    }

    let mut out = b"-==--==--==--==-".to_vec();
    out.extend_from_slice(&[5, 0, 0, 0]);
    for v in [144u32, n, 0, 12, 0, 32, 0x10000, dir_index.len() as u32, 1] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&[0u8; 8 + 16]);
    out.extend_from_slice(&[1 << 3, 0, 0, 0]);
    out.extend_from_slice(&[0u8; 4 + 8 + 4 + 4 + 40]);
    assert_eq!(out.len(), 144);

    out.extend(std::iter::repeat(0u8).take(files.len() * 12));
    for (_, offset, length) in files {
        out.extend_from_slice(&offset.to_be_bytes()[3..]);
        out.extend_from_slice(&length.to_be_bytes()[3..]);
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
