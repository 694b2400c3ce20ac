//! Integration tests for single-file and bulk key rotation.

use std::fs;
use std::path::Path;

use proxmox_mcp_crypt::config::{read_document, TokenRewriter};
use proxmox_mcp_crypt::crypto::{MasterKey, TokenCipher};
use proxmox_mcp_crypt::errors::{CryptError, FailureClass};
use proxmox_mcp_crypt::rotation::{rotate_all, rotate_file};
use serde_json::json;
use tempfile::TempDir;

fn write_encrypted_config(path: &Path, key: &MasterKey, token: &str) {
    let cipher = TokenCipher::new(key.clone()).unwrap();
    let doc = json!({
        "proxmox": {"host": "pve.example.com", "port": 8006},
        "auth": {
            "user": "root@pam",
            "token_name": "mcp",
            "token_value": cipher.encrypt(token).unwrap()
        },
        "logging": {"level": "INFO"}
    });
    fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

fn backups_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.contains(".backup."))
        .collect();
    names.sort();
    names
}

#[test]
fn rotated_file_only_opens_with_new_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let old = MasterKey::generate();
    let new = MasterKey::generate();
    write_encrypted_config(&path, &old, "pve-token");

    let report = rotate_file(&path, &old, &new, &TokenRewriter::default()).unwrap();
    assert_eq!(report.rotated_fields, vec!["auth.token_value"]);

    let doc = read_document(&path).unwrap();
    let token = doc["auth"]["token_value"].as_str().unwrap();
    assert_eq!(
        TokenCipher::new(new).unwrap().decrypt(token).unwrap(),
        "pve-token"
    );
    assert!(TokenCipher::new(old).unwrap().decrypt(token).is_err());

    // Non-token content and key order survive.
    assert_eq!(doc["proxmox"]["host"], "pve.example.com");
    let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["proxmox", "auth", "logging"]);
}

#[test]
fn failed_verification_leaves_directory_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    write_encrypted_config(&path, &MasterKey::generate(), "pve-token");
    let before = fs::read(&path).unwrap();

    let err = rotate_file(
        &path,
        &MasterKey::generate(),
        &MasterKey::generate(),
        &TokenRewriter::default(),
    )
    .unwrap_err();

    assert_eq!(err.failure_class(), Some(FailureClass::KeyMismatch));
    assert!(matches!(err, CryptError::Verification { .. }));
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(backups_in(dir.path()).is_empty());
}

#[test]
fn bulk_rotation_only_touches_encrypted_files() {
    let dir = TempDir::new().unwrap();
    let old = MasterKey::generate();
    write_encrypted_config(&dir.path().join("a.json"), &old, "token-a");
    write_encrypted_config(&dir.path().join("b.json"), &old, "token-b");

    let plain = dir.path().join("plain.json");
    let plain_text = r#"{"auth": {"token_value": "not-encrypted"}}"#;
    fs::write(&plain, plain_text).unwrap();
    fs::write(
        dir.path().join("config.example.json"),
        r#"{"auth": {"token_value": "enc:ignored"}}"#,
    )
    .unwrap();

    let result = rotate_all(
        dir.path(),
        &old,
        None,
        &TokenRewriter::default(),
        "config.example",
    )
    .unwrap();

    assert!(result.report.is_success());
    assert_eq!(result.report.successes.len(), 2);
    assert_eq!(result.report.skipped, vec![plain.clone()]);
    assert_eq!(backups_in(dir.path()).len(), 2);
    assert_eq!(fs::read_to_string(&plain).unwrap(), plain_text);

    let new = TokenCipher::new(result.new_key).unwrap();
    for (name, expected) in [("a.json", "token-a"), ("b.json", "token-b")] {
        let doc = read_document(&dir.path().join(name)).unwrap();
        let token = doc["auth"]["token_value"].as_str().unwrap();
        assert_eq!(new.decrypt(token).unwrap(), expected);
    }
}

#[test]
fn bulk_rotation_continues_past_a_failing_file() {
    let dir = TempDir::new().unwrap();
    let old = MasterKey::generate();
    write_encrypted_config(&dir.path().join("good.json"), &old, "ok");
    write_encrypted_config(&dir.path().join("other.json"), &MasterKey::generate(), "x");
    let other_before = fs::read(dir.path().join("other.json")).unwrap();

    let result = rotate_all(
        dir.path(),
        &old,
        Some(MasterKey::generate()),
        &TokenRewriter::default(),
        "config.example",
    )
    .unwrap();

    assert_eq!(result.report.successes.len(), 1);
    assert_eq!(result.report.failures.len(), 1);
    assert!(result.report.failures[0].0.ends_with("other.json"));
    assert_eq!(fs::read(dir.path().join("other.json")).unwrap(), other_before);
}

#[cfg(unix)]
#[test]
fn rotating_through_symlink_updates_the_target() {
    let dir = TempDir::new().unwrap();
    let real = dir.path().join("real.json");
    let link = dir.path().join("config.json");
    let old = MasterKey::generate();
    let new = MasterKey::generate();
    write_encrypted_config(&real, &old, "pve-token");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    rotate_file(&link, &old, &new, &TokenRewriter::default()).unwrap();

    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    let doc = read_document(&real).unwrap();
    let token = doc["auth"]["token_value"].as_str().unwrap();
    assert_eq!(
        TokenCipher::new(new).unwrap().decrypt(token).unwrap(),
        "pve-token"
    );
}
