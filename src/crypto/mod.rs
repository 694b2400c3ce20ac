//! Cryptographic primitives for proxmox-mcp-crypt.
//!
//! This module provides:
//! - Master key generation, parsing and resolution (`keys`)
//! - Master key files with owner-only permissions (`keyfile`)
//! - PBKDF2-HMAC-SHA256 per-token key derivation (`kdf`)
//! - Fernet authenticated encryption (`encryption`)
//! - The `enc:` token format (`token`)

pub mod encryption;
pub mod kdf;
pub mod keyfile;
pub mod keys;
pub mod token;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{MasterKey, TokenCipher, ...};
pub use kdf::{derive_cipher, generate_salt, CipherKey, PBKDF2_ITERATIONS, SALT_LEN};
pub use keyfile::{load_key_file, save_key_file};
pub use keys::{resolve_master_key, KeyOrigin, MasterKey, ResolvedKey};
pub use token::{is_encrypted, TokenCipher, ENCRYPTED_PREFIX};
