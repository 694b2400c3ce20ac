//! `proxmox-mcp-crypt rotate`: move one config file to a new master key.
//!
//! Verifies the current key, backs the file up, re-encrypts every token
//! with the new key and writes the file atomically.  The new key lives in
//! a key file and is never printed.

use std::path::Path;

use crate::cli::output;
use crate::cli::{
    ensure_new_key_differs, load_or_create_key, load_settings, require_master_key, resolve_path,
    Cli,
};
use crate::errors::Result;
use crate::rotation::{rotate_file, verify_file, RotationReport};

/// Execute the `rotate` command.
pub fn execute(
    cli: &Cli,
    config: &str,
    new_key_file: Option<&str>,
    allow_same_key: bool,
) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let rewriter = settings.rewriter()?;
    let path = resolve_path(&cwd, config);

    // 1. The current key must be set and must open the file.  Nothing is
    //    written, not even the new key file, until this passes.
    let old_key = require_master_key(&settings)?;
    verify_file(&path, &old_key, &rewriter)?;

    // 2. Load or create the replacement key.
    let key_path = match new_key_file {
        Some(p) => resolve_path(&cwd, p),
        None => settings.new_key_file_path(&cwd),
    };
    let (new_key, created) = load_or_create_key(&key_path)?;
    ensure_new_key_differs(&old_key, &new_key, &key_path, allow_same_key)?;
    if created {
        output::success(&format!("New master key saved to {}", key_path.display()));
    } else {
        output::info(&format!("Using new master key from {}", key_path.display()));
    }

    // 3. Back up, re-encrypt, write.
    let report = rotate_file(&path, &old_key, &new_key, &rewriter)?;

    output::success(&format!("Backup created at {}", report.backup_path.display()));
    if report.rotated_fields.is_empty() {
        output::info("No encrypted tokens found; file contents were left unchanged.");
    } else {
        output::success(&format!(
            "Rotated {} token(s) in {} ({} -> {})",
            report.rotated_fields.len(),
            path.display(),
            old_key.fingerprint(),
            new_key.fingerprint()
        ));
        if cli.verbose {
            print_rotated_fields(&report);
        }
    }

    print_next_steps(&settings.master_key_env, &key_path);
    Ok(())
}

pub(crate) fn print_rotated_fields(report: &RotationReport) {
    for field in &report.rotated_fields {
        output::tip(&format!("{}: {field}", report.path.display()));
    }
}

/// Instructions for switching the running server to the new key.
pub(crate) fn print_next_steps(env_var: &str, key_path: &Path) {
    output::info("Next steps:");
    output::tip(&format!("export {env_var}=\"$(cat {})\"", key_path.display()));
    output::tip("Restart the MCP server and confirm it starts cleanly.");
    output::tip("Delete the backup files once the new key is confirmed working.");
}
