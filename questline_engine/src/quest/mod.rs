//! Quest tracking: the persisted records and the ledger that mutates them.

pub mod ledger;
pub mod record;

pub use ledger::{ActiveQuests, QUEST_KEY, QuestLedger};
pub use record::{ActiveQuestView, CompletedQuest, QuestBook, QuestRecord, QuestStatus, Repaired};
