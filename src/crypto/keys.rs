//! Master key material: generation, parsing and resolution.
//!
//! A master key is 32 random bytes, base64url-encoded.  It is the root
//! secret every per-token key is derived from, so `MasterKey` never
//! formats its value: `Debug` is redacted, there is no `Display`, and
//! the text is only reachable through `expose_secret`.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::warn;
use zeroize::Zeroizing;

use super::token::LENIENT_URL_SAFE;
use crate::errors::{CryptError, Result};

/// Number of random bytes in a generated master key.
pub const MASTER_KEY_LEN: usize = 32;

/// A base64url-encoded master key, wiped from memory on drop.
#[derive(Clone)]
pub struct MasterKey {
    encoded: Zeroizing<String>,
}

impl MasterKey {
    /// Generate a new random master key.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        rand::rng().fill_bytes(&mut bytes[..]);
        Self {
            encoded: Zeroizing::new(URL_SAFE.encode(&bytes[..])),
        }
    }

    /// Parse an encoded master key, rejecting anything that does not
    /// decode to usable key material.
    pub fn parse(encoded: &str) -> Result<Self> {
        let key = Self {
            encoded: Zeroizing::new(encoded.trim().to_string()),
        };
        key.decode()?;
        Ok(key)
    }

    /// The encoded key text.  Only for writing to a key file or handing
    /// to another process; never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.encoded
    }

    /// Short identifier safe to show to operators: the first 8 hex
    /// characters of SHA-256 over the key bytes.
    pub fn fingerprint(&self) -> String {
        self.digest()[..4].iter().map(|b| format!("{b:02x}")).collect()
    }

    fn digest(&self) -> [u8; 32] {
        let digest = match self.decode() {
            Ok(bytes) => Sha256::digest(bytes.as_slice()),
            Err(_) => Sha256::digest(self.encoded.as_bytes()),
        };
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    /// Raw key bytes fed into the KDF.
    pub(crate) fn decode(&self) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = LENIENT_URL_SAFE
            .decode(self.encoded.as_bytes())
            .map(Zeroizing::new)
            .map_err(|_| CryptError::InvalidKey("master key is not valid base64url".into()))?;
        if bytes.is_empty() {
            return Err(CryptError::InvalidKey("master key is empty".into()));
        }
        Ok(bytes)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MasterKey").field(&"[REDACTED]").finish()
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        // Compare digests so padding differences and timing do not matter.
        self.digest() == other.digest()
    }
}

impl Eq for MasterKey {}

/// Where a resolved master key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    Explicit,
    Environment,
    /// Generated for this process only; nothing was persisted.
    Ephemeral,
}

/// A master key together with its origin.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key: MasterKey,
    pub origin: KeyOrigin,
}

/// Resolve the master key: explicit value, then the environment value,
/// then a freshly generated ephemeral key.
///
/// The caller reads the environment; this function never does.  Empty
/// strings count as absent.  The ephemeral path logs operator guidance
/// at `warn` level but never the key itself.
pub fn resolve_master_key(explicit: Option<&str>, env_value: Option<&str>) -> Result<ResolvedKey> {
    if let Some(value) = explicit.filter(|v| !v.trim().is_empty()) {
        return Ok(ResolvedKey {
            key: MasterKey::parse(value)?,
            origin: KeyOrigin::Explicit,
        });
    }

    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Ok(ResolvedKey {
            key: MasterKey::parse(value)?,
            origin: KeyOrigin::Environment,
        });
    }

    let key = MasterKey::generate();
    warn!("WARNING: no master key found in environment");
    warn!("a temporary key has been generated for this session only and was not saved");
    warn!("tokens encrypted in this session cannot be decrypted after the process exits");
    warn!("to create a permanent key run `proxmox-mcp-crypt generate-key` and export its contents as the master key variable");
    warn!(fingerprint = %key.fingerprint(), "security: the temporary key is never displayed");

    Ok(ResolvedKey {
        key,
        origin: KeyOrigin::Ephemeral,
    })
}
