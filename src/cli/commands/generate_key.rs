//! `proxmox-mcp-crypt generate-key`: create a new master key file.
//!
//! The key is written to a file with owner-only permissions and is never
//! echoed to the terminal.

use crate::cli::output;
use crate::cli::{load_settings, resolve_path};
use crate::crypto::keyfile::save_key_file;
use crate::crypto::keys::MasterKey;
use crate::errors::Result;

/// Execute the `generate-key` command.
pub fn execute(output_path: Option<&str>, force: bool) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let path = match output_path {
        Some(p) => resolve_path(&cwd, p),
        None => settings.key_file_path(&cwd),
    };

    let key = MasterKey::generate();
    save_key_file(&path, &key, force)?;

    output::success(&format!(
        "Master key saved to {} (fingerprint {})",
        path.display(),
        key.fingerprint()
    ));
    output::info("Next steps:");
    output::tip(&format!(
        "export {}=\"$(cat {})\"",
        settings.master_key_env,
        path.display()
    ));
    output::tip("proxmox-mcp-crypt encrypt <config.json>");
    output::warning("Keep this file private and back it up. Losing it means losing every encrypted token.");

    Ok(())
}
