//! Fernet authenticated encryption (AES-128-CBC + HMAC-SHA256).
//!
//! Layout of a Fernet token before base64url encoding:
//!   [ 0x80 | timestamp: 8 bytes BE | iv: 16 bytes | ciphertext | HMAC: 32 bytes ]
//!
//! The HMAC covers everything before it and is verified before any
//! decryption is attempted.  The timestamp is written but never checked
//! against a TTL.

use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::kdf::CipherKey;
use super::token::LENIENT_URL_SAFE;
use crate::errors::{CryptError, DecryptionFailure, Result};

const VERSION: u8 = 0x80;
const IV_LEN: usize = 16;
const HMAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// Version byte + timestamp + IV.
const HEADER_LEN: usize = 1 + 8 + IV_LEN;

/// Encrypt `plaintext` into a base64url Fernet token.
pub fn encrypt(key: &CipherKey, plaintext: &[u8]) -> Result<String> {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let timestamp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    seal(key, plaintext, &iv, timestamp)
}

/// Build a Fernet token from explicit IV and timestamp.
pub(crate) fn seal(
    key: &CipherKey,
    plaintext: &[u8],
    iv: &[u8; IV_LEN],
    timestamp: u64,
) -> Result<String> {
    let ciphertext = cbc::Encryptor::<Aes128>::new_from_slices(key.encryption_key(), iv)
        .map_err(|e| CryptError::Encryption(format!("cipher setup: {e}")))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + HMAC_LEN);
    token.push(VERSION);
    token.extend_from_slice(&timestamp.to_be_bytes());
    token.extend_from_slice(iv);
    token.extend_from_slice(&ciphertext);

    let tag = compute_hmac(key, &token)?;
    token.extend_from_slice(&tag);

    Ok(URL_SAFE.encode(token))
}

/// Decrypt a base64url Fernet token produced by `encrypt`.
pub fn decrypt(key: &CipherKey, token: &[u8]) -> Result<Vec<u8>> {
    let data = LENIENT_URL_SAFE
        .decode(token)
        .map_err(|_| CryptError::Decryption(DecryptionFailure::MalformedEncoding))?;

    // Header, at least one cipher block, and the tag.
    if data.len() < HEADER_LEN + BLOCK_LEN + HMAC_LEN || data[0] != VERSION {
        return Err(CryptError::Decryption(DecryptionFailure::MalformedToken));
    }
    let body_len = data.len() - HMAC_LEN - HEADER_LEN;
    if body_len % BLOCK_LEN != 0 {
        return Err(CryptError::Decryption(DecryptionFailure::MalformedToken));
    }

    // Verify the tag in constant time before touching the ciphertext.
    let (signed, tag) = data.split_at(data.len() - HMAC_LEN);
    let mut mac = Hmac::<Sha256>::new_from_slice(key.signing_key())
        .map_err(|_| CryptError::Decryption(DecryptionFailure::MalformedToken))?;
    mac.update(signed);
    mac.verify_slice(tag)
        .map_err(|_| CryptError::Decryption(DecryptionFailure::Authentication))?;

    let iv = &signed[9..HEADER_LEN];
    let ciphertext = &signed[HEADER_LEN..];
    cbc::Decryptor::<Aes128>::new_from_slices(key.encryption_key(), iv)
        .map_err(|_| CryptError::Decryption(DecryptionFailure::MalformedToken))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptError::Decryption(DecryptionFailure::MalformedToken))
}

fn compute_hmac(key: &CipherKey, data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.signing_key())
        .map_err(|e| CryptError::Encryption(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
