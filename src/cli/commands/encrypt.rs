//! `proxmox-mcp-crypt encrypt`: migrate plain-text tokens in a config file.

use crate::cli::output;
use crate::cli::{env_master_key, load_settings, resolve_path};
use crate::config::encrypt_config_file;
use crate::crypto::keys::{resolve_master_key, KeyOrigin};
use crate::crypto::token::TokenCipher;
use crate::errors::Result;

/// Execute the `encrypt` command.
pub fn execute(config: &str, output_path: Option<&str>) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let rewriter = settings.rewriter()?;
    let config_path = resolve_path(&cwd, config);
    let output_path = output_path.map(|p| resolve_path(&cwd, p));

    let env_value = env_master_key(&settings);
    let resolved = resolve_master_key(None, env_value.as_deref())?;
    let cipher = TokenCipher::new(resolved.key)?;

    let outcome = encrypt_config_file(&config_path, output_path.as_deref(), &cipher, &rewriter)?;

    if outcome.encrypted_fields.is_empty() {
        output::info("No plain-text tokens found; nothing new was encrypted.");
    } else {
        for field in &outcome.encrypted_fields {
            output::success(&format!("Encrypted {field}"));
        }
    }
    output::success(&format!(
        "Encrypted configuration written to {}",
        outcome.output_path.display()
    ));

    if resolved.origin == KeyOrigin::Ephemeral {
        output::warning(&format!(
            "A temporary key was used and not saved. The output cannot be decrypted later. \
             Run `proxmox-mcp-crypt generate-key` and set {} before encrypting.",
            settings.master_key_env
        ));
    } else {
        output::info("Next steps:");
        output::tip(&format!(
            "proxmox-mcp-crypt check {}",
            outcome.output_path.display()
        ));
        output::tip("Remove or secure the plain-text original once the encrypted file works.");
    }

    Ok(())
}
