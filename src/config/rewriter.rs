//! Finds encrypted fields in a configuration document and rewrites them.
//!
//! The rewriter works on a fixed list of dotted field paths
//! (`auth.token_value` by default).  Adding a field to the list is all it
//! takes to protect another value.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::crypto::token::{is_encrypted, TokenCipher};
use crate::errors::{CryptError, Result};

/// A dotted path into a JSON object, e.g. `auth.token_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(CryptError::Config(format!("invalid field path '{path}'")));
        }
        Ok(Self { segments })
    }

    fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(doc, |node, segment| node.as_object()?.get(segment))
    }

    fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        self.segments
            .iter()
            .try_fold(doc, |node, segment| node.as_object_mut()?.get_mut(segment))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// What a configured field currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Encrypted,
    Plaintext,
    NotString,
    Missing,
}

/// Decrypts, encrypts and re-keys the configured fields of a document.
#[derive(Debug, Clone)]
pub struct TokenRewriter {
    fields: Vec<FieldPath>,
}

impl Default for TokenRewriter {
    fn default() -> Self {
        Self {
            fields: vec![FieldPath {
                segments: vec!["auth".into(), "token_value".into()],
            }],
        }
    }
}

impl TokenRewriter {
    /// Build a rewriter for the given dotted paths.
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Result<Self> {
        let fields = paths
            .iter()
            .map(|p| FieldPath::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    /// Decrypt every configured field holding an `enc:` string.
    ///
    /// Absent, non-string and plaintext fields are left alone.  A failure
    /// is reported against the field name and never includes the value.
    pub fn decrypt_fields(&self, cipher: &TokenCipher, mut doc: Value) -> Result<Value> {
        for field in &self.fields {
            if let Some(Value::String(value)) = field.get_mut(&mut doc) {
                if !is_encrypted(value) {
                    continue;
                }
                let name = field.to_string();
                let plaintext = cipher
                    .decrypt(value)
                    .map_err(|e| CryptError::for_field(&name, value, e))?;
                *value = plaintext;
                debug!(field = %name, "decrypted field");
            }
        }
        Ok(doc)
    }

    /// Check that every encrypted field decrypts, without keeping results.
    pub fn verify(&self, cipher: &TokenCipher, doc: &Value) -> Result<()> {
        for field in &self.fields {
            if let Some(Value::String(value)) = field.get(doc) {
                if is_encrypted(value) {
                    cipher
                        .decrypt(value)
                        .map_err(|e| CryptError::for_field(&field.to_string(), value, e))?;
                }
            }
        }
        Ok(())
    }

    /// Encrypt every configured string field that is not yet encrypted.
    ///
    /// Returns the document and the paths that were encrypted.
    pub fn encrypt_fields(
        &self,
        cipher: &TokenCipher,
        mut doc: Value,
    ) -> Result<(Value, Vec<String>)> {
        let mut encrypted = Vec::new();
        for field in &self.fields {
            if let Some(Value::String(value)) = field.get_mut(&mut doc) {
                if is_encrypted(value) {
                    continue;
                }
                *value = cipher.encrypt(value)?;
                encrypted.push(field.to_string());
            }
        }
        Ok((doc, encrypted))
    }

    /// Decrypt every encrypted field with `old` and re-encrypt it with
    /// `new` under a fresh salt.
    ///
    /// Returns the document and the paths that were rotated.
    pub fn rotate_fields(
        &self,
        old: &TokenCipher,
        new: &TokenCipher,
        mut doc: Value,
    ) -> Result<(Value, Vec<String>)> {
        let mut rotated = Vec::new();
        for field in &self.fields {
            if let Some(Value::String(value)) = field.get_mut(&mut doc) {
                if !is_encrypted(value) {
                    continue;
                }
                let name = field.to_string();
                let plaintext = zeroize::Zeroizing::new(
                    old.decrypt(value)
                        .map_err(|e| CryptError::for_field(&name, value, e))?,
                );
                *value = new.encrypt(&plaintext)?;
                rotated.push(name);
            }
        }
        Ok((doc, rotated))
    }

    /// `true` if any configured field holds an `enc:` string.
    pub fn has_encrypted_content(&self, doc: &Value) -> bool {
        self.field_states(doc)
            .iter()
            .any(|(_, state)| *state == FieldState::Encrypted)
    }

    /// The state of each configured field, in configuration order.
    pub fn field_states(&self, doc: &Value) -> Vec<(String, FieldState)> {
        self.fields
            .iter()
            .map(|field| {
                let state = match field.get(doc) {
                    None => FieldState::Missing,
                    Some(Value::String(s)) if is_encrypted(s) => FieldState::Encrypted,
                    Some(Value::String(_)) => FieldState::Plaintext,
                    Some(_) => FieldState::NotString,
                };
                (field.to_string(), state)
            })
            .collect()
    }
}
