use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier used for quests, items and enemy types.
pub type Id = String;

/// Line shown when an NPC has no usable dialogue.
pub const PLACEHOLDER_LINE: &str = "...";

/// The objective a quest tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestKind {
    Collect,
    Kill,
}

impl QuestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestKind::Collect => "collect",
            QuestKind::Kill => "kill",
        }
    }

    /// Parse a quest type key as found in map metadata.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "collect" | "collect_item" => Some(QuestKind::Collect),
            "kill" | "kill_monster" => Some(QuestKind::Kill),
            _ => None,
        }
    }
}

impl fmt::Display for QuestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable quest template, usually attached to an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDef {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: QuestKind,
    /// Item id for collect quests, enemy id for kill quests.
    pub target: Id,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reward: RewardDef,
    /// Collect quests flagged here must be handed in explicitly.
    #[serde(default, skip_serializing_if = "is_false")]
    pub turn_in: bool,
}

impl QuestDef {
    /// Create a quest with a required count of one and no reward.
    pub fn new(id: impl Into<Id>, kind: QuestKind, target: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            kind,
            target: target.into(),
            count: 1,
            title: String::new(),
            description: String::new(),
            reward: RewardDef::default(),
            turn_in: false,
        }
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_reward(mut self, reward: RewardDef) -> Self {
        self.reward = reward;
        self
    }

    #[must_use]
    pub fn with_turn_in(mut self, turn_in: bool) -> Self {
        self.turn_in = turn_in;
        self
    }

    /// Number of matching events needed to finish. Never zero.
    pub fn required(&self) -> u32 {
        self.count.max(1)
    }

    /// Title for display, falling back to the description and then the id.
    pub fn display_title(&self) -> &str {
        if !self.title.trim().is_empty() {
            &self.title
        } else if !self.description.trim().is_empty() {
            &self.description
        } else {
            &self.id
        }
    }

    /// Short objective text, e.g. `Collect 3 × herb`.
    pub fn describe_objective(&self) -> String {
        let verb = match self.kind {
            QuestKind::Collect => "Collect",
            QuestKind::Kill => "Defeat",
        };
        format!("{verb} {} × {}", self.required(), self.target)
    }

    /// True when a world event of `kind` on `target` advances this quest.
    pub fn matches(&self, kind: QuestKind, target: &str) -> bool {
        self.kind == kind && self.target == target
    }
}

fn default_count() -> u32 {
    1
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// Reward granted when a quest completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDef {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub items: Vec<ItemRewardDef>,
}

impl RewardDef {
    pub fn is_empty(&self) -> bool {
        self.xp == 0 && self.gold == 0 && self.items.is_empty()
    }
}

/// Item reward entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRewardDef {
    pub id: Id,
    #[serde(default = "default_count")]
    pub quantity: u32,
}

impl ItemRewardDef {
    pub fn new(id: impl Into<Id>, quantity: u32) -> Self {
        Self { id: id.into(), quantity }
    }
}

/// Patrol waypoint in world pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
}

/// An NPC as the interaction core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcDef {
    pub name: String,
    pub dialogue: Vec<String>,
    #[serde(default)]
    pub quest: Option<QuestDef>,
    #[serde(default)]
    pub path: Vec<Waypoint>,
}

impl NpcDef {
    /// Build an NPC from its lines. An empty script becomes the placeholder line.
    pub fn new(name: impl Into<String>, dialogue: Vec<String>) -> Self {
        let dialogue = if dialogue.is_empty() {
            vec![PLACEHOLDER_LINE.to_string()]
        } else {
            dialogue
        };
        Self {
            name: name.into(),
            dialogue,
            quest: None,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_quest(mut self, quest: QuestDef) -> Self {
        self.quest = Some(quest);
        self
    }
}

/// A single named property on a map object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub name: String,
    pub value: String,
}

/// An object from the tile map's object layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub properties: Vec<ObjectProperty>,
}

impl MapObject {
    /// Look up a property value by name. Empty values count as absent.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}
