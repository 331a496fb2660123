use std::collections::HashSet;
use std::fmt;

use crate::defs::{NpcDef, QuestDef};

/// Validation error for a structurally unusable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    MissingValue { context: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::MissingValue { context } => {
                write!(f, "missing value ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a single quest definition.
///
/// Definitions produced by [`parse_quest`](crate::parse_quest) always pass;
/// this guards definitions built directly in code or read back from a save.
///
/// ```
/// use questline_data::{QuestDef, QuestKind, validate_quest};
///
/// let quest = QuestDef::new("q1", QuestKind::Collect, "herb").with_count(3);
/// assert!(validate_quest(&quest).is_empty());
/// assert_eq!(validate_quest(&QuestDef::new("", QuestKind::Kill, "slime")).len(), 1);
/// ```
pub fn validate_quest(quest: &QuestDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if quest.id.trim().is_empty() {
        errors.push(ValidationError::MissingValue {
            context: "quest id".to_string(),
        });
    }
    if quest.target.trim().is_empty() {
        errors.push(ValidationError::MissingValue {
            context: format!("quest '{}' target", quest.id),
        });
    }
    if quest.count == 0 {
        errors.push(ValidationError::InvalidValue {
            context: format!("quest '{}' count is zero", quest.id),
        });
    }
    for (idx, item) in quest.reward.items.iter().enumerate() {
        if item.id.trim().is_empty() {
            errors.push(ValidationError::MissingValue {
                context: format!("quest '{}' reward item {idx} id", quest.id),
            });
        }
        if item.quantity == 0 {
            errors.push(ValidationError::InvalidValue {
                context: format!("quest '{}' reward item '{}' quantity is zero", quest.id, item.id),
            });
        }
    }

    errors
}

/// Check a set of NPCs loaded from one map.
///
/// Besides per-quest checks this catches two NPCs sharing a name or offering
/// quests with the same id; the ledger de-duplicates by quest id, so the second
/// NPC's quest could never be offered.
pub fn validate_npcs(npcs: &[NpcDef]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();
    let mut quest_ids = HashSet::new();

    track_ids("npc", npcs.iter().map(|n| n.name.as_str()), &mut names, &mut errors);
    track_ids(
        "quest",
        npcs.iter().filter_map(|n| n.quest.as_ref()).map(|q| q.id.as_str()),
        &mut quest_ids,
        &mut errors,
    );

    for npc in npcs {
        if npc.name.trim().is_empty() {
            errors.push(ValidationError::MissingValue {
                context: "npc name".to_string(),
            });
        }
        if npc.dialogue.is_empty() {
            errors.push(ValidationError::MissingValue {
                context: format!("npc '{}' dialogue", npc.name),
            });
        }
        if let Some(quest) = &npc.quest {
            errors.extend(validate_quest(quest));
        }
    }

    errors
}

fn track_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    seen: &mut HashSet<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{ItemRewardDef, QuestKind, RewardDef};

    #[test]
    fn zero_reward_quantity_is_invalid() {
        let quest = QuestDef::new("q1", QuestKind::Collect, "herb").with_reward(RewardDef {
            xp: 0,
            gold: 0,
            items: vec![ItemRewardDef::new("potion", 0)],
        });
        let errors = validate_quest(&quest);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("potion"));
    }

    #[test]
    fn duplicate_quest_ids_across_npcs() {
        let quest = QuestDef::new("shared", QuestKind::Kill, "slime");
        let npcs = vec![
            NpcDef::new("npc_a", vec!["hi".into()]).with_quest(quest.clone()),
            NpcDef::new("npc_b", vec!["yo".into()]).with_quest(quest),
        ];
        let errors = validate_npcs(&npcs);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateId {
                kind: "quest",
                id: "shared".into()
            }]
        );
    }

    #[test]
    fn duplicate_npc_names() {
        let npcs = vec![NpcDef::new("npc_a", Vec::new()), NpcDef::new("npc_a", Vec::new())];
        assert_eq!(validate_npcs(&npcs).len(), 1);
    }
}
