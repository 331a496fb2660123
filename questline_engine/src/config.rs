//! Engine configuration.
//!
//! Read from a TOML file. Every field has a default, so an empty file (or no
//! file at all, via [`load_config_or_default`]) gives a working setup.
//!
//! ```toml
//! [storage]
//! dir = "saves"
//! inventory_key = "rpg_inventory_v1"
//! quest_key = "rpg_save_v1"
//!
//! [interaction]
//! completion_dialogue_delay_ms = 300
//! placeholder_line = "..."
//! interact_range = 48.0
//!
//! [logging]
//! filter = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use questline_data::PLACEHOLDER_LINE;
use serde::{Deserialize, Serialize};

use crate::inventory::INVENTORY_KEY;
use crate::quest::QUEST_KEY;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub interaction: InteractionConfig,
    pub logging: LoggingConfig,
}

/// Where and under which keys the ledgers persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one sub-directory per save slot.
    pub dir: PathBuf,
    pub inventory_key: String,
    pub quest_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_save_dir(),
            inventory_key: INVENTORY_KEY.to_string(),
            quest_key: QUEST_KEY.to_string(),
        }
    }
}

/// Tuning for the interaction arbitrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Pause between a forced quest completion and the NPC's dialogue.
    pub completion_dialogue_delay_ms: u64,
    /// Shown when an NPC has no lines.
    pub placeholder_line: String,
    /// Interaction radius in world pixels. Proximity is the world layer's job;
    /// it is carried here so both sides read the same number.
    pub interact_range: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            completion_dialogue_delay_ms: 300,
            placeholder_line: PLACEHOLDER_LINE.to_string(),
            interact_range: 48.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Platform data directory for saves, or `./saves` if there isn't one.
fn default_save_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from("saves"), |dir| dir.join("questline"))
}

/// Load configuration from `path`.
///
/// # Errors
/// If the file cannot be read or is not valid configuration TOML.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading config from '{}'", path.display()))?;
    let config: EngineConfig =
        toml::from_str(&text).with_context(|| format!("parsing config from '{}'", path.display()))?;
    info!("configuration loaded from '{}'", path.display());
    Ok(config)
}

/// Load configuration from `path`, falling back to defaults if it is missing or broken.
pub fn load_config_or_default(path: &Path) -> EngineConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{e:#}. Using default configuration.");
            EngineConfig::default()
        },
    }
}
