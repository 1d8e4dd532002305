use crate::error::ArchiveError;

/// Little-endian cursor over an in-memory index buffer.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self, ArchiveError> {
        if pos > buf.len() {
            return Err(ArchiveError::Truncated("seek"));
        }
        Ok(Self { buf, pos })
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn bytes(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], ArchiveError> {
        if n > self.remaining() {
            return Err(ArchiveError::Truncated(what));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: u64, what: &'static str) -> Result<(), ArchiveError> {
        let n = usize::try_from(n).map_err(|_| ArchiveError::Truncated(what))?;
        self.bytes(n, what).map(|_| ())
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], ArchiveError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N, what)?);
        Ok(out)
    }

    pub fn u8(&mut self, what: &'static str) -> Result<u8, ArchiveError> {
        Ok(self.array::<1>(what)?[0])
    }

    pub fn u32(&mut self, what: &'static str) -> Result<u32, ArchiveError> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    pub fn i32(&mut self, what: &'static str) -> Result<i32, ArchiveError> {
        Ok(i32::from_le_bytes(self.array(what)?))
    }

    pub fn u64(&mut self, what: &'static str) -> Result<u64, ArchiveError> {
        Ok(u64::from_le_bytes(self.array(what)?))
    }

    /// Signed 64-bit field that must not be negative (offsets and sizes).
    pub fn i64_unsigned(&mut self, what: &'static str) -> Result<u64, ArchiveError> {
        let v = i64::from_le_bytes(self.array(what)?);
        u64::try_from(v).map_err(|_| ArchiveError::Malformed(format!("negative {what}: {v}")))
    }

    /// UE bools are serialized as 32-bit integers.
    pub fn bool32(&mut self, what: &'static str) -> Result<bool, ArchiveError> {
        Ok(self.u32(what)? != 0)
    }

    /// Element count prefix of a serialized array, checked against what is left.
    pub fn count(&mut self, elem_size: usize, what: &'static str) -> Result<usize, ArchiveError> {
        let n = self.i32(what)?;
        let n = usize::try_from(n)
            .map_err(|_| ArchiveError::Malformed(format!("negative {what} count: {n}")))?;
        if n.saturating_mul(elem_size) > self.remaining() {
            return Err(ArchiveError::Truncated(what));
        }
        Ok(n)
    }

    /// Length-prefixed string: positive length is 8-bit chars, negative is
    /// UTF-16 code units. Both include a trailing NUL.
    pub fn fstring(&mut self, what: &'static str) -> Result<String, ArchiveError> {
        let len = self.i32(what)?;
        if len == 0 {
            return Ok(String::new());
        }
        if len > 0 {
            let raw = self.bytes(len as usize, what)?;
            let raw = raw.strip_suffix(&[0]).unwrap_or(raw);
            return Ok(String::from_utf8_lossy(raw).into_owned());
        }
        let units = len.unsigned_abs() as usize;
        let raw = self.bytes(units.saturating_mul(2), what)?;
        let mut wide: Vec<u16> =
            raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        if wide.last() == Some(&0) {
            wide.pop();
        }
        Ok(String::from_utf16_lossy(&wide))
    }
}

/// Strip the `../../../` style prefix engines put on mount points and any
/// leading slash, so keys read `Game/Content/...`.
pub(crate) fn normalize_mount_point(raw: &str) -> String {
    let mut s = raw.replace('\\', "/");
    while let Some(rest) = s.strip_prefix("../") {
        s = rest.to_string();
    }
    let s = s.trim_start_matches('/');
    if s.is_empty() || s.ends_with('/') {
        s.to_string()
    } else {
        format!("{s}/")
    }
}

pub(crate) fn join_virtual(mount: &str, rel: &str) -> String {
    format!("{mount}{}", rel.trim_start_matches('/'))
}
