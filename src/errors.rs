use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why a cipher operation on a well-formed `enc:` token failed.
///
/// Carries no payload so it can never leak token content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionFailure {
    /// A base64 segment of the token could not be decoded.
    MalformedEncoding,
    /// The decoded bytes are not a valid authenticated-cipher token.
    MalformedToken,
    /// The authentication tag did not verify (wrong key or tampering).
    Authentication,
    /// Decryption succeeded but the plaintext is not UTF-8.
    NotUtf8,
}

impl fmt::Display for DecryptionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::MalformedEncoding => "token contains invalid base64 data",
            Self::MalformedToken => "token structure is invalid",
            Self::Authentication => "authentication failed",
            Self::NotUtf8 => "decrypted value is not valid UTF-8",
        };
        f.write_str(msg)
    }
}

/// Category a field-level decryption failure is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    BadFormat,
    CorruptedCiphertext,
    KeyMismatch,
    Generic,
}

impl FailureClass {
    /// Sort a failed decryption of `value` into a class.
    ///
    /// The prefix check runs before the error is inspected.
    pub fn classify(value: &str, error: &CryptError) -> Self {
        if !value.starts_with(crate::crypto::token::ENCRYPTED_PREFIX) {
            return Self::BadFormat;
        }
        match error {
            CryptError::InvalidFormat => Self::CorruptedCiphertext,
            CryptError::InvalidKey(_) => Self::KeyMismatch,
            CryptError::Decryption(DecryptionFailure::Authentication) => Self::KeyMismatch,
            CryptError::Decryption(
                DecryptionFailure::MalformedEncoding | DecryptionFailure::MalformedToken,
            ) => Self::CorruptedCiphertext,
            _ => Self::Generic,
        }
    }

    fn describe(self, field: &str, source: &CryptError, env_var: &str) -> String {
        match self {
            Self::BadFormat => format!(
                "Configuration field '{field}' contains invalid encrypted token format. \
                 Encrypted tokens must start with 'enc:' prefix. \
                 Use `proxmox-mcp-crypt encrypt` to properly encrypt tokens."
            ),
            Self::CorruptedCiphertext => format!(
                "Failed to decrypt token for field '{field}': Token data is corrupted. \
                 The token may be damaged or use an unsupported format. \
                 Re-encrypt the original token value with `proxmox-mcp-crypt encrypt`."
            ),
            Self::KeyMismatch => format!(
                "Failed to decrypt token for field '{field}': Decryption key mismatch. \
                 Ensure the {env_var} environment variable is set correctly. \
                 If the master key was changed, tokens must be re-encrypted."
            ),
            Self::Generic => format!(
                "Failed to decrypt token for field '{field}': {source}. \
                 Verify the token format and master key are correct."
            ),
        }
    }
}

/// Environment variable named in remediation hints.
pub const DEFAULT_MASTER_KEY_ENV: &str = "PROXMOX_MCP_MASTER_KEY";

/// All errors that can occur in proxmox-mcp-crypt.
///
/// No variant ever carries a key value, plaintext or ciphertext.
#[derive(Debug, Error)]
pub enum CryptError {
    // --- Key errors ---
    #[error("Invalid master key: {0}")]
    InvalidKey(String),

    #[error("Key file error: {0}")]
    KeyFile(String),

    // --- Token errors ---
    #[error("Invalid encrypted token format")]
    InvalidFormat,

    #[error("Failed to decrypt token: {0}")]
    Decryption(DecryptionFailure),

    #[error("Failed to encrypt token: {0}")]
    Encryption(String),

    // --- Field errors ---
    #[error("{}", .class.describe(.field, .source, DEFAULT_MASTER_KEY_ENV))]
    FieldDecryption {
        field: String,
        class: FailureClass,
        #[source]
        source: Box<CryptError>,
    },

    // --- Rotation errors ---
    #[error("Failed to create backup of {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Current master key cannot decrypt {path}: {source}")]
    Verification {
        path: PathBuf,
        #[source]
        source: Box<CryptError>,
    },

    #[error("No configuration files found in {0}")]
    NoConfigFiles(PathBuf),

    // --- Config errors ---
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl CryptError {
    /// Wrap a token error with the name of the field it concerns.
    pub fn for_field(field: &str, value: &str, error: CryptError) -> Self {
        let class = FailureClass::classify(value, &error);
        Self::FieldDecryption {
            field: field.to_string(),
            class,
            source: Box::new(error),
        }
    }

    /// The failure class, if this is a field-qualified error.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Self::FieldDecryption { class, .. } => Some(*class),
            Self::Verification { source, .. } => source.failure_class(),
            _ => None,
        }
    }
}

/// Convenience type alias for proxmox-mcp-crypt results.
pub type Result<T> = std::result::Result<T, CryptError>;
