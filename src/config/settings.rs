use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{CryptError, Result, DEFAULT_MASTER_KEY_ENV};

/// Tool configuration, loaded from `.proxmox-mcp-crypt.toml`.
///
/// Every field has a sensible default so the tool works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Environment variable holding the current master key.
    #[serde(default = "default_master_key_env")]
    pub master_key_env: String,

    /// Where `generate-key` writes a new key by default.
    #[serde(default = "default_key_file")]
    pub key_file: String,

    /// Where rotation reads (or stores) the replacement key.
    #[serde(default = "default_new_key_file")]
    pub new_key_file: String,

    /// Dotted paths of configuration fields that hold encrypted tokens.
    #[serde(default = "default_encrypted_fields")]
    pub encrypted_fields: Vec<String>,

    /// Files whose name starts with this are skipped by bulk rotation.
    #[serde(default = "default_example_prefix")]
    pub example_prefix: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_master_key_env() -> String {
    DEFAULT_MASTER_KEY_ENV.to_string()
}

fn default_key_file() -> String {
    "proxmox-mcp.key".to_string()
}

fn default_new_key_file() -> String {
    "proxmox-mcp.key.new".to_string()
}

fn default_encrypted_fields() -> Vec<String> {
    vec!["auth.token_value".to_string()]
}

fn default_example_prefix() -> String {
    "config.example".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_key_env: default_master_key_env(),
            key_file: default_key_file(),
            new_key_file: default_new_key_file(),
            encrypted_fields: default_encrypted_fields(),
            example_prefix: default_example_prefix(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    pub const FILE_NAME: &'static str = ".proxmox-mcp-crypt.toml";

    /// Load settings from `<project_dir>/.proxmox-mcp-crypt.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CryptError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.encrypted_fields.is_empty() {
            return Err(CryptError::Config(format!(
                "{}: encrypted_fields must list at least one field",
                config_path.display()
            )));
        }

        Ok(settings)
    }

    /// Default key file path, relative to `project_dir`.
    pub fn key_file_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.key_file)
    }

    /// Default replacement-key path, relative to `project_dir`.
    pub fn new_key_file_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.new_key_file)
    }

    /// Build the field rewriter for the configured fields.
    pub fn rewriter(&self) -> Result<super::TokenRewriter> {
        super::TokenRewriter::from_paths(&self.encrypted_fields)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
