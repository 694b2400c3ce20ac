//! `proxmox-mcp-crypt rotate-all`: rotate every config file in a directory.

use std::fs;

use dialoguer::Confirm;

use crate::cli::commands::rotate::{print_next_steps, print_rotated_fields};
use crate::cli::output;
use crate::cli::{
    ensure_new_key_differs, load_or_create_key, load_settings, require_master_key, resolve_path,
    Cli,
};
use crate::errors::{CryptError, Result};
use crate::rotation::{discover_config_files, rotate_all};

/// Execute the `rotate-all` command.
pub fn execute(
    cli: &Cli,
    dir: &str,
    new_key_file: Option<&str>,
    allow_same_key: bool,
    yes: bool,
) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let rewriter = settings.rewriter()?;
    let dir = resolve_path(&cwd, dir);

    let old_key = require_master_key(&settings)?;

    let files = discover_config_files(&dir, &settings.example_prefix)?;
    if files.is_empty() {
        return Err(CryptError::NoConfigFiles(dir));
    }

    output::info(&format!("Found {} configuration file(s):", files.len()));
    for f in &files {
        output::tip(&f.display().to_string());
    }

    // Unless --yes is set, ask before touching anything.
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Rotate the master key for all of these files?")
            .default(false)
            .interact()
            .map_err(|e| CryptError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

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

    let result = rotate_all(
        &dir,
        &old_key,
        Some(new_key),
        &rewriter,
        &settings.example_prefix,
    )?;
    let report = &result.report;

    for r in &report.successes {
        output::success(&format!(
            "{} (backup {})",
            r.path.display(),
            r.backup_path.display()
        ));
        if cli.verbose {
            print_rotated_fields(r);
        }
    }
    for p in &report.skipped {
        output::info(&format!("{} skipped, no encrypted tokens", p.display()));
    }
    for (p, e) in &report.failures {
        output::error(&format!("{}: {e}", p.display()));
    }

    output::info(&format!(
        "Rotated {}, skipped {}, failed {}",
        report.successes.len(),
        report.skipped.len(),
        report.failures.len()
    ));

    // A key nothing was rotated to would be picked up by the next run.
    if created && report.successes.is_empty() {
        fs::remove_file(&key_path)?;
        output::info(&format!(
            "No file was rotated; removed the unused key file {}",
            key_path.display()
        ));
    }

    if !report.is_success() {
        return Err(CryptError::CommandFailed(format!(
            "{} file(s) could not be rotated; they still use the old key",
            report.failures.len()
        )));
    }

    print_next_steps(&settings.master_key_env, &key_path);
    Ok(())
}
