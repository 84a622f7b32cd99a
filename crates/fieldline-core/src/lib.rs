#![forbid(unsafe_code)]

//! Shared helpers for the Fieldline workspace: hashing, credential material,
//! process exit codes, and filesystem/env resolution.

use sha2::{Digest, Sha256};
use std::path::PathBuf;

pub const CRATE_NAME: &str = "fieldline-core";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

pub const ENV_FIELDLINE_LOG_LEVEL: &str = "FIELDLINE_LOG_LEVEL";
pub const ENV_FIELDLINE_DATA_DIR: &str = "FIELDLINE_DATA_DIR";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Stored credential form is `salt$digest` where `digest = sha256(salt:password)`.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt = hex::encode(rand::random::<[u8; 16]>());
    let digest = sha256_hex(format!("{salt}:{password}").as_bytes());
    format!("{salt}${digest}")
}

#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    if salt.is_empty() || digest.is_empty() {
        return false;
    }
    sha256_hex(format!("{salt}:{password}").as_bytes()) == digest
}

/// Mints a session token. The first element is handed to the caller once;
/// only the second (its digest) is ever persisted.
#[must_use]
pub fn mint_session_token() -> (String, String) {
    let token = hex::encode(rand::random::<[u8; 32]>());
    let token_hash = sha256_hex(token.as_bytes());
    (token, token_hash)
}

#[must_use]
pub fn session_token_hash(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

#[must_use]
pub fn resolve_fieldline_data_dir() -> PathBuf {
    if let Ok(explicit) = std::env::var(ENV_FIELDLINE_DATA_DIR) {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        let trimmed = xdg_data_home.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed).join("fieldline");
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed).join(".local/share").join("fieldline");
        }
    }

    PathBuf::from(".fieldline").join("data")
}
