//! JSON-file backed session slot.

use super::{SessionSlot, SlotResult};
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stores all keys in one JSON object file.
///
/// A missing file reads as empty. Writes go through a sibling temp file and a
/// rename so a crash never leaves a half-written slot behind.
#[derive(Debug)]
pub struct FileSessionSlot {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> SlotResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> SlotResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("tmp");
        std::fs::write(&staging, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&staging, &self.path)?;
        debug!(
            "event=slot_write module=session status=ok keys={}",
            map.len()
        );
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> SlotResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // An unreadable file is replaced instead of blocking every later write.
        let mut map = self.read_map().unwrap_or_default();
        apply(&mut map);
        self.write_map(&map)
    }
}

impl SessionSlot for FileSessionSlot {
    fn get(&self, key: &str) -> SlotResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> SlotResult<()> {
        self.mutate(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> SlotResult<()> {
        self.mutate(|map| {
            map.remove(key);
        })
    }
}
