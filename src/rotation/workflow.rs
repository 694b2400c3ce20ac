//! Single-file master key rotation.
//!
//! Per file: verify the old key, back up, decrypt with the old key,
//! re-encrypt with the new key, write atomically.  Nothing on disk is
//! touched until verification has passed.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::backup::create_backup;
use crate::config::document::{read_document, write_document};
use crate::config::rewriter::TokenRewriter;
use crate::crypto::keys::MasterKey;
use crate::crypto::token::TokenCipher;
use crate::errors::{CryptError, Result};

/// Outcome of rotating one file.
#[derive(Debug, Clone)]
pub struct RotationReport {
    pub path: PathBuf,
    pub backup_path: PathBuf,
    /// Field paths that were re-encrypted (empty if none were encrypted).
    pub rotated_fields: Vec<String>,
}

/// Read `path` and check that `old_key` decrypts every encrypted field.
///
/// Nothing on disk is changed.  Returns the document as read.
pub fn verify_file(path: &Path, old_key: &MasterKey, rewriter: &TokenRewriter) -> Result<Value> {
    let cipher = TokenCipher::new(old_key.clone())?;
    let doc = read_document(path)?;
    rewriter
        .verify(&cipher, &doc)
        .map_err(|source| CryptError::Verification {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
    debug!(path = %path.display(), key = %old_key.fingerprint(), "current master key verified");
    Ok(doc)
}

/// Re-encrypt every encrypted field of `path` from `old_key` to `new_key`.
///
/// Fails with `Verification` before any filesystem change if `old_key`
/// cannot decrypt the file, and with `Backup` if the copy fails.
pub fn rotate_file(
    path: &Path,
    old_key: &MasterKey,
    new_key: &MasterKey,
    rewriter: &TokenRewriter,
) -> Result<RotationReport> {
    let old = TokenCipher::new(old_key.clone())?;
    let new = TokenCipher::new(new_key.clone())?;
    if old_key == new_key {
        warn!(path = %path.display(), "new master key is the same as the current one");
    }

    // 1. Verify the current key against the file as it is on disk.
    let doc = verify_file(path, old_key, rewriter)?;

    // 2. Back up before any mutation.
    let backup_path = create_backup(path)?;
    info!(path = %path.display(), backup = %backup_path.display(), "backup created");

    // 3. Decrypt with the old key, re-encrypt with the new one.
    let (doc, rotated_fields) = rewriter.rotate_fields(&old, &new, doc)?;

    // 4. Write the whole document back atomically.
    write_document(path, &doc)?;
    info!(
        path = %path.display(),
        fields = ?rotated_fields,
        old_key = %old_key.fingerprint(),
        new_key = %new_key.fingerprint(),
        "master key rotated"
    );

    Ok(RotationReport {
        path: path.to_path_buf(),
        backup_path,
        rotated_fields,
    })
}
