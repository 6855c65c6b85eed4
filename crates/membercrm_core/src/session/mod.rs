//! Session slot: small key-value storage kept outside the versioned store.
//!
//! # Responsibility
//! - Hold the serialized auth session and the remember-me flag.
//! - Offer an in-memory slot for tests and a JSON-file slot for the CLI/app.
//!
//! # Invariants
//! - Values are opaque strings; interpretation belongs to the auth service.
//! - `FileSessionSlot` rewrites the whole file on every mutation.

mod file_slot;

pub use file_slot::FileSessionSlot;

use std::collections::HashMap;
use std::sync::Mutex;

/// Slot key holding the JSON session.
pub const SESSION_KEY: &str = "membercrm.session";
/// Slot key holding `"true"` when the session was created with remember-me.
pub const REMEMBER_ME_KEY: &str = "membercrm.rememberMe";

pub type SlotResult<T> = Result<T, SlotError>;

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("session slot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session slot file is not a JSON string map: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key-value storage for session data.
pub trait SessionSlot: Send + Sync {
    fn get(&self, key: &str) -> SlotResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SlotResult<()>;
    fn remove(&self, key: &str) -> SlotResult<()>;
}

/// Process-local slot; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemorySessionSlot {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionSlot for MemorySessionSlot {
    fn get(&self, key: &str) -> SlotResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SlotResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SlotResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySessionSlot, SessionSlot};

    #[test]
    fn memory_slot_set_get_remove() {
        let slot = MemorySessionSlot::new();
        assert_eq!(slot.get("k").unwrap(), None);
        slot.set("k", "v").unwrap();
        assert_eq!(slot.get("k").unwrap().as_deref(), Some("v"));
        slot.remove("k").unwrap();
        slot.remove("k").unwrap();
        assert_eq!(slot.get("k").unwrap(), None);
    }
}
