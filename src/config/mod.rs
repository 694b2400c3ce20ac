//! Configuration: tool settings, JSON documents, field rewriting and the
//! server config loader.

pub mod document;
pub mod loader;
pub mod rewriter;
pub mod settings;

pub use document::{read_document, write_document};
pub use loader::{encrypt_config_file, load_config, EncryptOutcome, ServerConfig};
pub use rewriter::{FieldPath, FieldState, TokenRewriter};
pub use settings::Settings;
