//! Rotating every encrypted configuration file under a directory.
//!
//! Files are processed one at a time.  A failure is recorded against its
//! file and the batch carries on, so the report always lists exactly
//! which files were rotated, skipped, or left untouched by an error.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::workflow::{rotate_file, RotationReport};
use crate::config::document::read_document;
use crate::config::rewriter::TokenRewriter;
use crate::crypto::keys::MasterKey;
use crate::errors::{CryptError, Result};

/// Per-file results of a bulk rotation.
#[derive(Debug, Default)]
pub struct BulkRotationReport {
    pub successes: Vec<RotationReport>,
    /// Files without encrypted content; no backup was made for them.
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, CryptError)>,
}

impl BulkRotationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A finished bulk rotation and the key every rotated file now uses.
#[derive(Debug)]
pub struct BulkRotation {
    pub new_key: MasterKey,
    pub report: BulkRotationReport,
}

/// Find candidate config files: `*.json` under `dir`, recursively, except
/// files whose name starts with `example_prefix`.  Sorted by path.
///
/// Paths resolving to the same real file are listed once, under the first
/// name in sort order, so a symlink and its target are not rotated twice.
pub fn discover_config_files(dir: &Path, example_prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(CryptError::Config(format!(
            "Directory not found: {}",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(CryptError::Config(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    collect_json_files(dir, example_prefix, &mut files)?;
    files.sort();

    let mut seen = HashSet::new();
    files.retain(|p| seen.insert(fs::canonicalize(p).unwrap_or_else(|_| p.clone())));
    Ok(files)
}

fn collect_json_files(dir: &Path, example_prefix: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        // `file_type` does not follow symlinks, so linked dirs cannot loop.
        if entry.file_type()?.is_dir() {
            collect_json_files(&path, example_prefix, out)?;
            continue;
        }

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_example = entry
            .file_name()
            .to_string_lossy()
            .starts_with(example_prefix);
        if is_json && !is_example && path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Rotate every encrypted config under `dir` from `old_key` to `new_key`.
///
/// One shared new key is generated up front when `new_key` is `None`.
/// Only discovery errors abort; per-file errors land in the report.
pub fn rotate_all(
    dir: &Path,
    old_key: &MasterKey,
    new_key: Option<MasterKey>,
    rewriter: &TokenRewriter,
    example_prefix: &str,
) -> Result<BulkRotation> {
    let files = discover_config_files(dir, example_prefix)?;
    if files.is_empty() {
        return Err(CryptError::NoConfigFiles(dir.to_path_buf()));
    }

    let new_key = new_key.unwrap_or_else(MasterKey::generate);
    info!(
        dir = %dir.display(),
        files = files.len(),
        new_key = %new_key.fingerprint(),
        "starting bulk key rotation"
    );

    let mut report = BulkRotationReport::default();
    for path in files {
        let has_encrypted = match read_document(&path) {
            Ok(doc) => rewriter.has_encrypted_content(&doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read configuration");
                report.failures.push((path, e));
                continue;
            }
        };

        if !has_encrypted {
            info!(path = %path.display(), "skipping, no encrypted content");
            report.skipped.push(path);
            continue;
        }

        match rotate_file(&path, old_key, &new_key, rewriter) {
            Ok(r) => report.successes.push(r),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rotation failed");
                report.failures.push((path, e));
            }
        }
    }

    info!(
        rotated = report.successes.len(),
        skipped = report.skipped.len(),
        failed = report.failures.len(),
        "bulk key rotation finished"
    );

    Ok(BulkRotation { new_key, report })
}
