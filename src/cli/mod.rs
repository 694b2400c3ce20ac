//! CLI module: Clap argument parser, output helpers and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::Settings;
use crate::crypto::keyfile::{load_key_file, save_key_file};
use crate::crypto::keys::MasterKey;
use crate::errors::{CryptError, Result};

/// proxmox-mcp-crypt CLI: protect API tokens in Proxmox MCP config files.
#[derive(Parser)]
#[command(
    name = "proxmox-mcp-crypt",
    about = "Encrypt Proxmox MCP configuration tokens and rotate the master key",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a new master key and save it to a file (never printed)
    GenerateKey {
        /// Where to write the key (default: proxmox-mcp.key)
        #[arg(short, long)]
        output: Option<String>,
        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Encrypt plain-text tokens in a configuration file
    Encrypt {
        /// Configuration file to encrypt
        config: String,
        /// Output path (default: <config>.encrypted.json)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show the encryption status of a configuration file
    Status {
        /// Configuration file to inspect
        config: String,
    },

    /// Load and decrypt a configuration file to confirm the key works
    Check {
        /// Configuration file (default: $PROXMOX_MCP_CONFIG)
        #[arg(env = "PROXMOX_MCP_CONFIG")]
        config: Option<String>,
    },

    /// Rotate the master key for a single configuration file
    Rotate {
        /// Configuration file to rotate
        config: String,
        /// New key file; created with a fresh key if it does not exist
        #[arg(long)]
        new_key_file: Option<String>,
        /// Re-encrypt even if the new key file holds the current key
        #[arg(long)]
        allow_same_key: bool,
    },

    /// Rotate the master key for every configuration file in a directory
    RotateAll {
        /// Directory to scan recursively for *.json files
        dir: String,
        /// New key file; created with a fresh key if it does not exist
        #[arg(long)]
        new_key_file: Option<String>,
        /// Re-encrypt even if the new key file holds the current key
        #[arg(long)]
        allow_same_key: bool,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load settings from the current working directory.
pub fn load_settings() -> Result<(PathBuf, Settings)> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    Ok((cwd, settings))
}

/// Read the raw master key value from the configured environment variable.
///
/// This is the only place the process environment is consulted for key
/// material.  Empty values count as unset.
pub fn env_master_key(settings: &Settings) -> Option<String> {
    std::env::var(&settings.master_key_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// The current master key, required for decryption and rotation.
pub fn require_master_key(settings: &Settings) -> Result<MasterKey> {
    match env_master_key(settings) {
        Some(value) => MasterKey::parse(&value),
        None => Err(CryptError::CommandFailed(format!(
            "no master key found in environment variable {}; export the current master key first",
            settings.master_key_env
        ))),
    }
}

/// Load the replacement key from `path`, or generate one and save it there.
///
/// Returns the key and whether it was newly generated.
pub fn load_or_create_key(path: &Path) -> Result<(MasterKey, bool)> {
    if path.exists() {
        return Ok((load_key_file(path)?, false));
    }
    let key = MasterKey::generate();
    save_key_file(path, &key, false)?;
    Ok((key, true))
}

/// Refuse a rotation whose new key is the current key.
///
/// A leftover new-key file from an earlier rotation usually holds the key
/// that is now current; rotating to it would change nothing.
pub fn ensure_new_key_differs(
    old_key: &MasterKey,
    new_key: &MasterKey,
    key_path: &Path,
    allow_same_key: bool,
) -> Result<()> {
    if old_key == new_key && !allow_same_key {
        return Err(CryptError::CommandFailed(format!(
            "{} holds the current master key; delete it to generate a fresh key, \
             or pass --allow-same-key to re-encrypt with the same key",
            key_path.display()
        )));
    }
    Ok(())
}

/// Resolve a user-supplied path against the working directory.
pub fn resolve_path(cwd: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        cwd.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_or_create_generates_then_reuses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.key");

        let (first, created) = load_or_create_key(&path).unwrap();
        assert!(created);
        let (second, created) = load_or_create_key(&path).unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[test]
    fn same_key_is_refused_unless_allowed() {
        let key = MasterKey::generate();
        let path = Path::new("proxmox-mcp.key.new");

        let err = ensure_new_key_differs(&key, &key, path, false).unwrap_err();
        assert!(err.to_string().contains("--allow-same-key"));
        assert!(!err.to_string().contains(key.expose_secret()));

        assert!(ensure_new_key_differs(&key, &key, path, true).is_ok());
        assert!(ensure_new_key_differs(&key, &MasterKey::generate(), path, false).is_ok());
    }

    #[test]
    fn resolve_path_keeps_absolute() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_path(cwd, "/etc/x.json"), PathBuf::from("/etc/x.json"));
        assert_eq!(resolve_path(cwd, "x.json"), PathBuf::from("/work/x.json"));
    }

    #[test]
    fn cli_parses_rotate_all() {
        let cli = Cli::parse_from([
            "proxmox-mcp-crypt",
            "rotate-all",
            "configs",
            "--new-key-file",
            "next.key",
            "--yes",
        ]);
        match cli.command {
            Commands::RotateAll {
                dir,
                new_key_file,
                allow_same_key,
                yes,
            } => {
                assert!(!allow_same_key);
                assert_eq!(dir, "configs");
                assert_eq!(new_key_file.as_deref(), Some("next.key"));
                assert!(yes);
            }
            _ => panic!("expected rotate-all"),
        }
    }
}
