use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::manifest::ModManifest;

/// Serialize the whole document first, then write it to `dest` or, when no
/// destination is given, to `stdout` followed by a newline. Nothing is
/// written if serialization fails.
pub fn write_manifest<W: Write>(doc: &ModManifest, dest: Option<&Path>, mut stdout: W) -> Result<()> {
    let json = doc.to_json_pretty()?;
    match dest {
        Some(path) => std::fs::write(path, &json)
            .map_err(|source| Error::OutputWrite { dest: path.display().to_string(), source }),
        None => {
            let to_stdout = |source: std::io::Error| Error::OutputWrite { dest: "stdout".into(), source };
            stdout.write_all(&json).map_err(to_stdout)?;
            stdout.write_all(b"\n").map_err(to_stdout)?;
            stdout.flush().map_err(to_stdout)
        }
    }
}
