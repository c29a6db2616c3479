use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Prefix carried by every issued token
pub const TOKEN_PREFIX: &str = "pntr_";

/// Characters of the raw token kept in the clear for identification
const DISPLAY_PREFIX_LEN: usize = 12;

/// Hash a password using argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Checked when a login names no known user, so that path also pays for a
/// full argon2 verification.
static DUMMY_PASSWORD_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("pantry-no-such-user").ok());

/// Run a password check that always fails
pub fn verify_dummy_password(password: &str) {
    if let Some(hash) = DUMMY_PASSWORD_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// Expiry of a token issued at `now`, `None` when tokens do not expire
pub fn token_expiry(now: DateTime<Utc>, ttl_days: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    let Some(days) = ttl_days else {
        return Ok(None);
    };
    TimeDelta::try_days(days)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .map(Some)
        .with_context(|| format!("Token lifetime of {} days is out of range", days))
}

/// Generate an auth token: returns (raw_token, token_hash)
///
/// Format: `pntr_` prefix + 40 random hex chars = 45 chars total.
/// Only the hash is persisted; the raw value is shown to the client once.
pub fn generate_auth_token() -> (String, String) {
    let mut bytes = [0u8; 20];
    OsRng.fill_bytes(&mut bytes);
    let hex_part: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let raw = format!("{}{}", TOKEN_PREFIX, hex_part);
    let hash = hash_auth_token(&raw);
    (raw, hash)
}

/// Hash an auth token using SHA256
pub fn hash_auth_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Leading characters stored next to the hash so tokens can be told apart
pub fn token_prefix(raw_token: &str) -> &str {
    raw_token
        .char_indices()
        .nth(DISPLAY_PREFIX_LEN)
        .map_or(raw_token, |(idx, _)| &raw_token[..idx])
}
