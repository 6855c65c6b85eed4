//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own state that lives outside the versioned store (the auth session).

pub mod auth_service;
pub mod notifier;
