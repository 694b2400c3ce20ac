//! `proxmox-mcp-crypt status`: report which token fields are encrypted.

use crate::cli::output;
use crate::cli::{env_master_key, load_settings, resolve_path, Cli};
use crate::config::{read_document, FieldState};
use crate::crypto::keys::MasterKey;
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli, config: &str) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let rewriter = settings.rewriter()?;
    let path = resolve_path(&cwd, config);

    let doc = read_document(&path)?;
    let states = rewriter.field_states(&doc);

    output::info(&format!("Configuration: {}", path.display()));
    if cli.verbose {
        output::tip(&format!(
            "checked fields: {}",
            settings.encrypted_fields.join(", ")
        ));
    }
    output::print_field_table(&states);

    match env_master_key(&settings) {
        Some(value) => match MasterKey::parse(&value) {
            Ok(key) => output::success(&format!(
                "{} is set (fingerprint {})",
                settings.master_key_env,
                key.fingerprint()
            )),
            Err(_) => output::warning(&format!(
                "{} is set but is not a valid master key",
                settings.master_key_env
            )),
        },
        None => output::warning(&format!("{} is not set", settings.master_key_env)),
    }

    if states.iter().any(|(_, s)| *s == FieldState::Plaintext) {
        output::tip(&format!("proxmox-mcp-crypt encrypt {config}"));
    }

    Ok(())
}
