//! Credential handling primitives.
//!
//! # Responsibility
//! - Hash and verify user passwords.
//! - Score password strength and generate temporary passwords.
//!
//! # Invariants
//! - Plaintext passwords and hashes never reach the log.

pub mod password;
pub mod strength;
