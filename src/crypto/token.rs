//! Encrypted token strings as stored in configuration files.
//!
//! Two formats are understood:
//!
//! ```text
//! enc:<salt_b64>:<ciphertext_b64>   current, random 16-byte salt per token
//! enc:<ciphertext_b64>              legacy, fixed salt, decrypt only
//! ```
//!
//! `<ciphertext_b64>` is the base64url encoding of a Fernet token.  Any
//! value without the `enc:` prefix is plaintext and passes through
//! `decrypt` unchanged.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use tracing::debug;
use zeroize::Zeroizing;

use super::encryption;
use super::kdf::{derive_cipher, generate_salt};
use super::keys::MasterKey;
use crate::errors::{CryptError, DecryptionFailure, Result};

/// Prefix that marks a value as encrypted.
pub const ENCRYPTED_PREFIX: &str = "enc:";

/// URL-safe base64 that accepts input with or without padding.
pub(crate) const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// `true` if `value` carries the `enc:` prefix.  No other validation.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// The `:`-separated segments after the prefix.
#[derive(Debug, PartialEq, Eq)]
enum TokenParts<'a> {
    Salted { salt: &'a str, ciphertext: &'a str },
    Legacy { ciphertext: &'a str },
}

impl<'a> TokenParts<'a> {
    fn parse(body: &'a str) -> Result<Self> {
        let parts: Vec<&str> = body.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CryptError::InvalidFormat);
        }
        match parts.as_slice() {
            [salt, ciphertext] => Ok(Self::Salted {
                salt: *salt,
                ciphertext: *ciphertext,
            }),
            [ciphertext] => Ok(Self::Legacy {
                ciphertext: *ciphertext,
            }),
            _ => Err(CryptError::InvalidFormat),
        }
    }
}

/// Encrypts and decrypts token strings under one master key.
///
/// A fresh cipher key is derived for every call, so the struct only
/// holds the master key.
#[derive(Debug, Clone)]
pub struct TokenCipher {
    master_key: MasterKey,
}

impl TokenCipher {
    /// Build a cipher, failing with `InvalidKey` if the key is unusable.
    pub fn new(master_key: MasterKey) -> Result<Self> {
        master_key.decode()?;
        Ok(Self { master_key })
    }

    /// The master key this cipher encrypts under.
    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    /// Encrypt `plaintext` into `enc:<salt>:<ciphertext>` with a new salt.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let salt = generate_salt();
        let key = derive_cipher(&self.master_key, Some(&salt))?;
        let fernet = encryption::encrypt(&key, plaintext.as_bytes())?;

        Ok(format!(
            "{ENCRYPTED_PREFIX}{}:{}",
            URL_SAFE_NO_PAD.encode(salt),
            URL_SAFE_NO_PAD.encode(fernet.as_bytes())
        ))
    }

    /// Decrypt a token; values without the `enc:` prefix are returned as is.
    pub fn decrypt(&self, token: &str) -> Result<String> {
        let Some(body) = token.strip_prefix(ENCRYPTED_PREFIX) else {
            return Ok(token.to_string());
        };

        let plaintext = match TokenParts::parse(body)? {
            TokenParts::Salted { salt, ciphertext } => {
                let salt = decode_segment(salt)?;
                let key = derive_cipher(&self.master_key, Some(&salt))?;
                encryption::decrypt(&key, &decode_segment(ciphertext)?)?
            }
            TokenParts::Legacy { ciphertext } => {
                debug!("decrypting legacy fixed-salt token");
                let key = derive_cipher(&self.master_key, None)?;
                encryption::decrypt(&key, &decode_segment(ciphertext)?)?
            }
        };

        let plaintext = Zeroizing::new(plaintext);
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| CryptError::Decryption(DecryptionFailure::NotUtf8))
    }

    /// Encrypt `value` unless it is already encrypted.
    pub fn migrate(&self, value: &str) -> Result<String> {
        if is_encrypted(value) {
            return Ok(value.to_string());
        }
        self.encrypt(value)
    }

    /// Produce a legacy `enc:<ciphertext>` token.  Never used for real
    /// encryption; only fixtures need the old format.
    #[cfg(test)]
    pub(crate) fn encrypt_legacy(&self, plaintext: &str) -> Result<String> {
        let key = derive_cipher(&self.master_key, None)?;
        let fernet = encryption::encrypt(&key, plaintext.as_bytes())?;
        Ok(format!(
            "{ENCRYPTED_PREFIX}{}",
            base64::engine::general_purpose::URL_SAFE.encode(fernet.as_bytes())
        ))
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>> {
    LENIENT_URL_SAFE
        .decode(segment)
        .map_err(|_| CryptError::Decryption(DecryptionFailure::MalformedEncoding))
}
