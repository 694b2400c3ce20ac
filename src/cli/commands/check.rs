//! `proxmox-mcp-crypt check`: load a config and decrypt its tokens.
//!
//! Succeeds only if the server would be able to start with the current
//! master key.  Token values are never shown.

use crate::cli::output;
use crate::cli::{env_master_key, load_settings, resolve_path, Cli};
use crate::config::load_config;
use crate::crypto::keys::MasterKey;
use crate::errors::{CryptError, Result};

/// Execute the `check` command.
pub fn execute(cli: &Cli, config: Option<&str>) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let rewriter = settings.rewriter()?;

    let config = config.ok_or_else(|| {
        CryptError::CommandFailed(
            "no configuration file given; pass a path or set PROXMOX_MCP_CONFIG".into(),
        )
    })?;
    let path = resolve_path(&cwd, config);

    let key = env_master_key(&settings)
        .map(|v| MasterKey::parse(&v))
        .transpose()?;

    let server = load_config(&path, key.as_ref(), &rewriter)?;

    output::success(&format!("Configuration {} loaded", path.display()));
    output::info(&format!(
        "Proxmox {}:{} as {}!{}",
        server.proxmox.host, server.proxmox.port, server.auth.user, server.auth.token_name
    ));
    if let Some(key) = key {
        output::info(&format!("Master key fingerprint {}", key.fingerprint()));
    }
    if cli.verbose {
        output::tip(&format!(
            "service {}, verify_ssl {}, log level {}",
            server.proxmox.service, server.proxmox.verify_ssl, server.logging.level
        ));
    }

    Ok(())
}
