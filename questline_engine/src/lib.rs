#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! Progression and interaction core for tile-based RPGs.
//!
//! The world layer reports what happened ("interact pressed near this NPC",
//! "picked up a herb") and the engine answers with state transitions and
//! persisted facts: which quests are active or done, what the player holds,
//! and whether the screen should show an offer, a line of dialogue, or nothing.

use time::OffsetDateTime;

pub const QUESTLINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod arbitrator;
pub mod bus;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod inventory;
pub mod progression;
pub mod quest;
pub mod scheduler;
pub mod session;
pub mod slots;
pub mod slug;
pub mod storage;

pub use arbitrator::{Arbitrator, InteractionMode, Transition};
pub use bus::{EventBus, EventKind, GameEvent, InventoryChange, Subscription};
pub use config::{EngineConfig, load_config, load_config_or_default};
pub use dialogue::DialoguePlayer;
pub use error::{LedgerError, StoreError};
pub use inventory::InventoryLedger;
pub use progression::Progression;
pub use quest::{ActiveQuestView, QuestLedger, QuestStatus};
pub use session::GameSession;
pub use slots::SaveSlots;
pub use storage::{FileStore, MemoryStore, SaveStore};

/// Current wall-clock time as unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}
