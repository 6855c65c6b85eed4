//! Argon2id password hashing and random credential generation.
//!
//! # Responsibility
//! - Produce PHC-format hashes for storage in `User::password_hash`.
//! - Verify plaintext candidates against stored hashes.
//! - Generate session tokens and temporary passwords.
//!
//! # Invariants
//! - Every hash carries its own random salt.
//! - Generated temporary passwords contain every character class scored by
//!   `strength::validate`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

const LOWERCASE: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+?";
const SESSION_TOKEN_BYTES: usize = 32;

pub type PasswordResult<T> = Result<T, PasswordError>;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    InvalidHash(String),
    #[error("password worker task failed: {0}")]
    TaskFailed(String),
}

/// Hashes `password` with Argon2id default parameters and a fresh salt.
pub fn hash_password(password: &str) -> PasswordResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

/// Returns `Ok(false)` on mismatch; errors only when `hash` cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> PasswordResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|err| PasswordError::InvalidHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// `hash_password` on the blocking pool so the async caller keeps running.
pub async fn hash_password_off_thread(password: &str) -> PasswordResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| PasswordError::TaskFailed(err.to_string()))?
}

/// `verify_password` on the blocking pool.
pub async fn verify_password_off_thread(password: &str, hash: &str) -> PasswordResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|err| PasswordError::TaskFailed(err.to_string()))?
}

/// Opaque 256-bit session token, hex encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Random password drawn from a mixed-class alphabet.
///
/// One character of each class is placed first and the result is shuffled,
/// so any `length >= 4` yields all four classes. Ambiguous glyphs (`l`, `I`,
/// `O`, `0`, `1`) are left out of the alphabet.
pub fn generate_temporary_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let classes = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS];
    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();

    let alphabet: Vec<u8> = classes.concat();
    while chars.len() < length {
        chars.push(alphabet[rng.gen_range(0..alphabet.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::{
        generate_session_token, generate_temporary_password, hash_password,
        hash_password_off_thread, verify_password, verify_password_off_thread, PasswordError,
    };
    use crate::security::strength;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Sup3r-secret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Sup3r-secret", &hash).unwrap());
        assert!(!verify_password("sup3r-secret", &hash).unwrap());
    }

    #[tokio::test]
    async fn off_thread_helpers_match_the_sync_ones() {
        let hash = hash_password_off_thread("Sup3r-secret").await.unwrap();
        assert!(verify_password("Sup3r-secret", &hash).unwrap());
        assert!(verify_password_off_thread("Sup3r-secret", &hash).await.unwrap());
        assert!(!verify_password_off_thread("wrong", &hash).await.unwrap());
        assert!(matches!(
            verify_password_off_thread("x", "not-a-phc-string").await,
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hash_password("Sup3r-secret").unwrap();
        let second = hash_password("Sup3r-secret").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let err = verify_password("anything", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, PasswordError::InvalidHash(_)));
    }

    #[test]
    fn temporary_passwords_are_always_strong() {
        for _ in 0..200 {
            let candidate = generate_temporary_password(16);
            assert_eq!(candidate.chars().count(), 16);
            assert_eq!(strength::validate(&candidate).score, 4, "{candidate}");
        }
    }

    #[test]
    fn session_tokens_are_unique_hex() {
        let first = generate_session_token();
        let second = generate_session_token();
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
