//! Persisted quest state.
//!
//! The whole quest document is one [`QuestBook`]:
//!
//! ```json
//! {
//!   "active":    { "q1": { "definition": {..}, "progress": 2, "acceptedAt": 1700000000000 } },
//!   "completed": { "q0": { "completedAt": 1690000000000, "definition": {..} } },
//!   "player":    { "xp": 10, "gold": 0 }
//! }
//! ```
//!
//! `active` is an object keyed by quest id but keeps acceptance order, which
//! is the order the quest log shows.

use std::collections::BTreeMap;
use std::fmt;

use questline_data::{QuestDef, QuestKind};
use serde::{Deserialize, Serialize};

use crate::progression::Progression;

/// Runtime progress for one accepted quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestRecord {
    pub definition: QuestDef,
    #[serde(default)]
    pub progress: u32,
    /// Unix time in milliseconds.
    #[serde(default)]
    pub accepted_at: i64,
}

impl QuestRecord {
    pub fn new(definition: QuestDef, accepted_at: i64) -> Self {
        Self {
            definition,
            progress: 0,
            accepted_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn required(&self) -> u32 {
        self.definition.required()
    }

    pub fn is_satisfied(&self) -> bool {
        self.progress >= self.required()
    }
}

/// Completion metadata kept forever once a quest is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedQuest {
    /// Unix time in milliseconds.
    #[serde(default)]
    pub completed_at: i64,
    pub definition: QuestDef,
}

/// Where a quest id stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestStatus {
    Unknown,
    Active,
    Completed,
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestStatus::Unknown => "unknown",
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// The quest ledger's persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestBook {
    #[serde(default, with = "ordered_records")]
    pub active: Vec<QuestRecord>,
    #[serde(default)]
    pub completed: BTreeMap<String, CompletedQuest>,
    #[serde(default)]
    pub player: Progression,
}

impl QuestBook {
    pub fn find_active(&self, id: &str) -> Option<&QuestRecord> {
        self.active.iter().find(|r| r.id() == id)
    }

    pub fn status(&self, id: &str) -> QuestStatus {
        if self.completed.contains_key(id) {
            QuestStatus::Completed
        } else if self.find_active(id).is_some() {
            QuestStatus::Active
        } else {
            QuestStatus::Unknown
        }
    }

    /// Clean up a loaded document.
    ///
    /// Records without an id are dropped, as are records that are also listed
    /// as completed.
    pub fn repair(&mut self) -> Repaired {
        let mut repaired = Repaired::default();
        let completed = &self.completed;
        self.active.retain(|r| {
            if r.id().is_empty() {
                repaired.unnamed += 1;
                false
            } else if completed.contains_key(r.id()) {
                repaired.already_completed += 1;
                false
            } else {
                true
            }
        });
        repaired
    }
}

/// What [`QuestBook::repair`] dropped from `active`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repaired {
    pub unnamed: usize,
    pub already_completed: usize,
}

/// Borrowed row of the quest log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveQuestView<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub progress: u32,
    pub required: u32,
    pub kind: QuestKind,
}

impl<'a> From<&'a QuestRecord> for ActiveQuestView<'a> {
    fn from(record: &'a QuestRecord) -> Self {
        let def = &record.definition;
        Self {
            id: &def.id,
            title: def.display_title(),
            description: &def.description,
            progress: record.progress,
            required: def.required(),
            kind: def.kind,
        }
    }
}

/// `Vec<QuestRecord>` as a JSON object keyed by quest id, preserving order.
mod ordered_records {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    use super::QuestRecord;

    pub fn serialize<S>(records: &[QuestRecord], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(records.iter().map(|r| (r.id(), r)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<QuestRecord>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RecordsVisitor)
    }

    struct RecordsVisitor;

    impl<'de> Visitor<'de> for RecordsVisitor {
        type Value = Vec<QuestRecord>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of quest id to quest record")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut records: Vec<QuestRecord> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, mut record)) = map.next_entry::<String, QuestRecord>()? {
                // the key is authoritative
                record.definition.id = id;
                match records.iter_mut().find(|r| r.id() == record.id()) {
                    Some(existing) => *existing = record,
                    None => records.push(record),
                }
            }
            Ok(records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, progress: u32) -> QuestRecord {
        let mut r = QuestRecord::new(QuestDef::new(id, QuestKind::Kill, "slime").with_count(2), 1);
        r.progress = progress;
        r
    }

    #[test]
    fn active_serializes_as_ordered_object() {
        let book = QuestBook {
            active: vec![record("zeta", 0), record("alpha", 1)],
            ..QuestBook::default()
        };
        let json = serde_json::to_string(&book).unwrap();
        assert!(json.starts_with(r#"{"active":{"zeta":{"definition""#));
        assert!(json.find("\"zeta\"").unwrap() < json.find("\"alpha\"").unwrap());

        let back: QuestBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }

    #[test]
    fn missing_sections_default() {
        let book: QuestBook = serde_json::from_str("{}").unwrap();
        assert!(book.active.is_empty());
        assert!(book.completed.is_empty());
        assert_eq!(book.player, Progression::default());
    }

    #[test]
    fn map_key_overrides_definition_id() {
        let json = r#"{"active":{"real":{"definition":{"id":"other","type":"kill","target":"bat"},"progress":1}}}"#;
        let book: QuestBook = serde_json::from_str(json).unwrap();
        assert_eq!(book.active[0].id(), "real");
        assert_eq!(book.active[0].accepted_at, 0);
    }

    #[test]
    fn repair_enforces_disjoint_states() {
        let mut book = QuestBook {
            active: vec![record("q1", 0), record("", 2), record("q2", 1)],
            ..QuestBook::default()
        };
        book.completed.insert(
            "q1".into(),
            CompletedQuest {
                completed_at: 5,
                definition: record("q1", 0).definition,
            },
        );
        assert_eq!(
            book.repair(),
            Repaired {
                unnamed: 1,
                already_completed: 1
            }
        );
        assert_eq!(book.status("q1"), QuestStatus::Completed);
        assert_eq!(book.status("q2"), QuestStatus::Active);
        assert_eq!(book.status("q3"), QuestStatus::Unknown);
        assert_eq!(book.active.len(), 1);
    }

    #[test]
    fn view_uses_display_title() {
        let mut r = record("q1", 1);
        r.definition.title = String::new();
        r.definition.description = "Thin the slimes".into();
        let view = ActiveQuestView::from(&r);
        assert_eq!(view.title, "Thin the slimes");
        assert_eq!(view.required, 2);
        assert_eq!(view.kind, QuestKind::Kill);
    }
}
