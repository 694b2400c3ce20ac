//! Master key rotation for one configuration file or a directory of them.
//!
//! The sequence per file is verify, backup, decrypt with the old key,
//! encrypt with the new key, atomic write.  Files are never processed
//! concurrently; callers must not rotate the same path from two
//! processes at once.

pub mod backup;
pub mod bulk;
pub mod workflow;

pub use backup::{backup_path, create_backup};
pub use bulk::{discover_config_files, rotate_all, BulkRotation, BulkRotationReport};
pub use workflow::{rotate_file, verify_file, RotationReport};
