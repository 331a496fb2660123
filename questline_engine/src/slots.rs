//! Save-slot discovery.
//!
//! A save root holds one directory per slot; each slot directory is a
//! [`FileStore`] containing the inventory and quest documents. Independent
//! slots never share ledger state.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use log::info;

use crate::slug::slot_dir_name;
use crate::storage::FileStore;

/// A discovered save slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub name: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// Directory of save slots.
#[derive(Debug, Clone)]
pub struct SaveSlots {
    root: PathBuf,
}

impl SaveSlots {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory used for `slot`.
    pub fn slot_dir(&self, slot: &str) -> PathBuf {
        self.root.join(slot_dir_name(slot))
    }

    /// Open (creating if needed) the store for `slot`.
    ///
    /// # Errors
    /// If the slot directory cannot be created.
    pub fn open(&self, slot: &str) -> Result<FileStore> {
        let dir = self.slot_dir(slot);
        fs::create_dir_all(&dir).with_context(|| format!("creating save slot {}", dir.display()))?;
        info!("opened save slot '{slot}' at {}", dir.display());
        Ok(FileStore::new(dir))
    }

    /// List existing slots, most recently modified first.
    ///
    /// # Errors
    /// If the save root exists but cannot be enumerated.
    pub fn list(&self) -> Result<Vec<SlotInfo>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut slots = Vec::new();
        for entry in fs::read_dir(&self.root).with_context(|| format!("reading {}", self.root.display()))? {
            let entry = entry.with_context(|| format!("enumerating {}", self.root.display()))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let modified = latest_modified(&path);
            slots.push(SlotInfo { name, path, modified });
        }
        slots.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.name.cmp(&b.name)));
        Ok(slots)
    }

    /// Delete a slot and everything in it. Missing slots are not an error.
    ///
    /// # Errors
    /// If the directory exists but cannot be removed.
    pub fn delete(&self, slot: &str) -> Result<()> {
        let dir = self.slot_dir(slot);
        if dir.exists() {
            fs::remove_dir_all(&dir).with_context(|| format!("deleting save slot {}", dir.display()))?;
            info!("deleted save slot '{slot}'");
        }
        Ok(())
    }
}

/// Newest modification time among the slot's documents, or the directory's own.
fn latest_modified(dir: &Path) -> Option<SystemTime> {
    let own = fs::metadata(dir).and_then(|m| m.modified()).ok();
    let newest_file = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .max();
    newest_file.max(own)
}

/// Format a human-friendly modified time relative to now.
pub fn format_modified(modified: SystemTime) -> String {
    match SystemTime::now().duration_since(modified) {
        Ok(delta) => format_duration(delta),
        Err(_) => "in the future".to_string(),
    }
}

/// Convert a duration into a compact "time ago" string.
fn format_duration(duration: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = MINUTE * 60;
    const DAY: u64 = HOUR * 24;
    const WEEK: u64 = DAY * 7;

    let secs = duration.as_secs();
    if secs < 30 {
        "just now".to_string()
    } else if secs < MINUTE {
        format!("{secs}s ago")
    } else if secs < HOUR {
        format!("{}m ago", secs / MINUTE)
    } else if secs < DAY {
        format!("{}h ago", secs / HOUR)
    } else if secs < WEEK {
        format!("{}d ago", secs / DAY)
    } else {
        format!("{}w ago", secs / WEEK)
    }
}
