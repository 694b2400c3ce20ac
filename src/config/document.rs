//! Reading and atomically writing JSON configuration documents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{CryptError, Result};

/// Read and parse a JSON document.
pub fn read_document(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(CryptError::ConfigNotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| CryptError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `doc` to `path` **atomically**.
///
/// The document is serialized to a temp file in the same directory,
/// which takes over the permissions of any existing file at `path`,
/// then renamed over the target.  Readers never see a half-written file.
/// A symlinked `path` is written through: the link stays and its target
/// receives the new content.
pub fn write_document(path: &Path, doc: &Value) -> Result<()> {
    let mut buf = serde_json::to_vec_pretty(doc).map_err(|source| CryptError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    buf.push(b'\n');

    let target = resolve_target(path)?;
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        target.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, &buf)?;
    if let Ok(meta) = fs::metadata(&target) {
        fs::set_permissions(&tmp_path, meta.permissions())?;
    }
    if let Err(e) = fs::rename(&tmp_path, &target) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// The real file behind `path`; `path` itself when nothing exists yet.
fn resolve_target(path: &Path) -> Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(fs::canonicalize(path)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(e) => Err(e.into()),
    }
}
