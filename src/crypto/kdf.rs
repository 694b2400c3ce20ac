//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! Every token is encrypted under a key derived from the master key and
//! a per-token salt.  The 32 derived bytes are split into a 16-byte
//! signing key and a 16-byte encryption key for the Fernet construction.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use super::keys::MasterKey;
use crate::errors::Result;

/// PBKDF2 iteration count.  Changing it breaks every stored token.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the per-token salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Salt used by the legacy `enc:<ciphertext>` format.
pub(crate) const LEGACY_SALT: &[u8] = b"proxmox_mcp_salt";

/// Length of the derived key (signing half + encryption half).
const KEY_LEN: usize = 32;

/// A derived Fernet key, zeroed on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct CipherKey {
    bytes: [u8; KEY_LEN],
}

impl CipherKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// HMAC-SHA256 key (first half).
    pub fn signing_key(&self) -> &[u8] {
        &self.bytes[..16]
    }

    /// AES-128-CBC key (second half).
    pub fn encryption_key(&self) -> &[u8] {
        &self.bytes[16..]
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey([REDACTED])")
    }
}

/// Derive a cipher key from `master_key` and `salt`.
///
/// `None` selects the fixed legacy salt; only decryption of old tokens
/// should ever take that path.
pub fn derive_cipher(master_key: &MasterKey, salt: Option<&[u8]>) -> Result<CipherKey> {
    let key_bytes = master_key.decode()?;
    let salt = salt.unwrap_or(LEGACY_SALT);

    let mut out = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(&key_bytes, salt, PBKDF2_ITERATIONS, &mut out);
    let key = CipherKey::from_bytes(out);
    out.zeroize();

    Ok(key)
}

/// Generate a fresh random salt for one encryption.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
