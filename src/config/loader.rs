//! Loading the Proxmox MCP server configuration.
//!
//! The server reads a JSON file, decrypts any `enc:` fields, and only
//! then validates the typed model.  `encrypt_config_file` is the
//! migration path from a plain-text config to an encrypted one.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use super::document::{read_document, write_document};
use super::rewriter::TokenRewriter;
use crate::crypto::keys::MasterKey;
use crate::crypto::token::TokenCipher;
use crate::errors::{CryptError, Result};

/// Validated server configuration with decrypted tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub proxmox: ProxmoxConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxmoxConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    #[serde(default = "default_service")]
    pub service: String,
}

/// API token credentials.  `Debug` never shows the token value.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub user: String,
    pub token_name: String,
    pub token_value: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("user", &self.user)
            .field("token_name", &self.token_name)
            .field("token_value", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
            file: None,
        }
    }
}

fn default_port() -> u16 {
    8006
}

fn default_verify_ssl() -> bool {
    true
}

fn default_service() -> String {
    "PVE".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

/// Load, decrypt and validate the server configuration at `path`.
///
/// `master_key` is only needed when the document has encrypted fields;
/// without one those fields fail with a key-mismatch error.
pub fn load_config(
    path: &Path,
    master_key: Option<&MasterKey>,
    rewriter: &TokenRewriter,
) -> Result<ServerConfig> {
    let doc = read_document(path)?;

    let host = doc
        .get("proxmox")
        .and_then(|p| p.get("host"))
        .and_then(|h| h.as_str())
        .unwrap_or_default();
    if host.trim().is_empty() {
        return Err(CryptError::Config("Proxmox host cannot be empty".into()));
    }

    let doc = match master_key {
        Some(key) => {
            let cipher = TokenCipher::new(key.clone())?;
            rewriter.decrypt_fields(&cipher, doc)?
        }
        None => {
            if let Some((field, _)) = rewriter
                .field_states(&doc)
                .into_iter()
                .find(|(_, s)| *s == super::FieldState::Encrypted)
            {
                return Err(CryptError::for_field(
                    &field,
                    crate::crypto::ENCRYPTED_PREFIX,
                    CryptError::InvalidKey("no master key set".into()),
                ));
            }
            doc
        }
    };

    serde_json::from_value(doc).map_err(|e| {
        CryptError::Config(format!("Failed to load config {}: {e}", path.display()))
    })
}

/// Result of migrating a plain-text config.
#[derive(Debug)]
pub struct EncryptOutcome {
    pub output_path: PathBuf,
    pub encrypted_fields: Vec<String>,
}

/// Default output path for `encrypt_config_file`: `<stem>.encrypted.json`.
pub fn default_encrypted_path(config_path: &Path) -> PathBuf {
    config_path.with_extension("encrypted.json")
}

/// Encrypt the configured plain-text fields of `config_path` and write
/// the result to `output_path` (or the default encrypted path).
pub fn encrypt_config_file(
    config_path: &Path,
    output_path: Option<&Path>,
    cipher: &TokenCipher,
    rewriter: &TokenRewriter,
) -> Result<EncryptOutcome> {
    let output_path = output_path.map_or_else(
        || default_encrypted_path(config_path),
        Path::to_path_buf,
    );

    let doc = read_document(config_path)?;
    let (doc, encrypted_fields) = rewriter.encrypt_fields(cipher, doc)?;
    write_document(&output_path, &doc)?;

    info!(
        input = %config_path.display(),
        output = %output_path.display(),
        fields = encrypted_fields.len(),
        key = %cipher.master_key().fingerprint(),
        "encrypted configuration written"
    );

    Ok(EncryptOutcome {
        output_path,
        encrypted_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureClass;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_json(dir: &TempDir, name: &str, value: &serde_json::Value) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    fn sample(token: &str) -> serde_json::Value {
        json!({
            "proxmox": {"host": "pve.example.com", "port": 8006, "verify_ssl": false},
            "auth": {"user": "root@pam", "token_name": "mcp", "token_value": token},
            "logging": {"level": "DEBUG"}
        })
    }

    #[test]
    fn loads_plaintext_config_without_key() {
        let dir = TempDir::new().unwrap();
        let path = write_json(&dir, "config.json", &sample("plain"));

        let cfg = load_config(&path, None, &TokenRewriter::default()).unwrap();
        assert_eq!(cfg.proxmox.host, "pve.example.com");
        assert!(!cfg.proxmox.verify_ssl);
        assert_eq!(cfg.proxmox.service, "PVE");
        assert_eq!(cfg.auth.token_value, "plain");
        assert_eq!(cfg.logging.level, "DEBUG");
    }

    #[test]
    fn decrypts_before_validation() {
        let dir = TempDir::new().unwrap();
        let key = MasterKey::generate();
        let cipher = TokenCipher::new(key.clone()).unwrap();
        let path = write_json(&dir, "config.json", &sample(&cipher.encrypt("s3cret").unwrap()));

        let cfg = load_config(&path, Some(&key), &TokenRewriter::default()).unwrap();
        assert_eq!(cfg.auth.token_value, "s3cret");
        assert!(!format!("{cfg:?}").contains("s3cret"));
    }

    #[test]
    fn encrypted_config_without_key_is_key_mismatch() {
        let dir = TempDir::new().unwrap();
        let cipher = TokenCipher::new(MasterKey::generate()).unwrap();
        let token = cipher.encrypt("s3cret").unwrap();
        let path = write_json(&dir, "config.json", &sample(&token));

        let err = load_config(&path, None, &TokenRewriter::default()).unwrap_err();
        assert_eq!(err.failure_class(), Some(FailureClass::KeyMismatch));
        assert!(err.to_string().contains("auth.token_value"));
        assert!(!err.to_string().contains(&token));
    }

    #[test]
    fn empty_host_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample("plain");
        doc["proxmox"]["host"] = json!("");
        let path = write_json(&dir, "config.json", &doc);

        let err = load_config(&path, None, &TokenRewriter::default()).unwrap_err();
        assert!(err.to_string().contains("host cannot be empty"));
    }

    #[test]
    fn encrypt_config_file_writes_default_output() {
        let dir = TempDir::new().unwrap();
        let key = MasterKey::generate();
        let cipher = TokenCipher::new(key.clone()).unwrap();
        let path = write_json(&dir, "config.json", &sample("plain-token"));

        let outcome =
            encrypt_config_file(&path, None, &cipher, &TokenRewriter::default()).unwrap();
        assert_eq!(outcome.output_path, dir.path().join("config.encrypted.json"));
        assert_eq!(outcome.encrypted_fields, vec!["auth.token_value"]);

        let text = fs::read_to_string(&outcome.output_path).unwrap();
        assert!(!text.contains("plain-token"));
        let cfg = load_config(&outcome.output_path, Some(&key), &TokenRewriter::default())
            .unwrap();
        assert_eq!(cfg.auth.token_value, "plain-token");
    }
}
