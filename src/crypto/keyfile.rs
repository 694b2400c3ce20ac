//! Master key files.
//!
//! `generate-key` and key rotation persist keys to a file instead of
//! printing them.  The file holds the encoded key and a trailing newline
//! and is created with owner-only permissions.

use std::fs;
use std::io::Write;
use std::path::Path;

use super::keys::MasterKey;
use crate::errors::{CryptError, Result};

/// Write `key` to `path` with restrictive permissions (owner read/write).
///
/// Fails if the file exists unless `overwrite` is set.
pub fn save_key_file(path: &Path, key: &MasterKey, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(CryptError::KeyFile(format!(
            "key file already exists at {} (use --force to replace it)",
            path.display()
        )));
    }

    // Ensure the parent directory exists.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                CryptError::KeyFile(format!("cannot create key file directory: {e}"))
            })?;
        }
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| CryptError::KeyFile(format!("failed to open key file: {e}")))?;

    // `mode` only applies on creation; tighten a pre-existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            CryptError::KeyFile(format!("failed to set key file permissions: {e}"))
        })?;
    }

    file.write_all(key.expose_secret().as_bytes())
        .and_then(|()| file.write_all(b"\n"))
        .and_then(|()| file.sync_all())
        .map_err(|e| CryptError::KeyFile(format!("failed to write key file: {e}")))?;

    Ok(())
}

/// Load and validate a master key from `path`.
pub fn load_key_file(path: &Path) -> Result<MasterKey> {
    if !path.exists() {
        return Err(CryptError::KeyFile(format!(
            "key file not found at {}",
            path.display()
        )));
    }

    let contents = zeroize::Zeroizing::new(
        fs::read_to_string(path)
            .map_err(|e| CryptError::KeyFile(format!("failed to read key file: {e}")))?,
    );

    MasterKey::parse(contents.trim())
}
