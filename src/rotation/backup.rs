//! Timestamped backups taken before a configuration file is rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::errors::{CryptError, Result};

/// Format of the timestamp suffix: `YYYYMMDD_HHMMSS`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<path>.backup.<YYYYMMDD_HHMMSS>` for the given time.
pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".backup.{}", at.format(TIMESTAMP_FORMAT)));
    PathBuf::from(name)
}

/// Copy `path` to a timestamped sibling and return the backup path.
///
/// An existing backup is never overwritten: a `.1`, `.2`, ... suffix is
/// appended when the timestamped name is taken.
pub fn create_backup(path: &Path) -> Result<PathBuf> {
    let base = backup_path(path, Local::now());
    let mut candidate = base.clone();
    let mut n = 1u32;
    while candidate.exists() {
        let mut name = base.as_os_str().to_os_string();
        name.push(format!(".{n}"));
        candidate = PathBuf::from(name);
        n += 1;
    }

    fs::copy(path, &candidate).map_err(|source| CryptError::Backup {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn backup_name_uses_timestamp_suffix() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let p = backup_path(Path::new("/etc/pmcp/config.json"), at);
        assert_eq!(
            p,
            PathBuf::from("/etc/pmcp/config.json.backup.20240309_070501")
        );
    }

    #[test]
    fn backup_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{\n  \"a\": 1\n}\n").unwrap();

        let backup = create_backup(&path).unwrap();
        assert_eq!(fs::read(&backup).unwrap(), fs::read(&path).unwrap());
        let name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("config.json.backup."));
    }

    #[test]
    fn second_backup_in_same_second_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"first").unwrap();
        let first = create_backup(&path).unwrap();

        fs::write(&path, b"second").unwrap();
        let second = create_backup(&path).unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"first");
        assert_eq!(fs::read(&second).unwrap(), b"second");
    }

    #[test]
    fn missing_source_is_backup_error() {
        let dir = TempDir::new().unwrap();
        let err = create_backup(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CryptError::Backup { .. }));
    }
}
