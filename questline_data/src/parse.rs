//! Parsing of loosely typed map-object metadata.
//!
//! Tile maps store NPC dialogue, quests and patrol paths as string properties
//! whose shape varies between authoring tools: dialogue may be a JSON array or
//! a bare line, paths may be JSON or `x,y;x,y`. This module settles all of that
//! once and produces validated definitions, or a [`DefinitionError`] naming the
//! offending object.

use serde::Deserialize;
use thiserror::Error;

use crate::defs::{Id, ItemRewardDef, MapObject, NpcDef, PLACEHOLDER_LINE, QuestDef, QuestKind, RewardDef, Waypoint};

/// Failure to turn map metadata into a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("malformed definition ({context}): {reason}")]
    MalformedDefinition { context: String, reason: String },
}

impl DefinitionError {
    fn malformed(context: &str, reason: impl Into<String>) -> Self {
        DefinitionError::MalformedDefinition {
            context: context.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestDef {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    target: Option<String>,
    count: Option<i64>,
    target_count: Option<i64>,
    title: Option<String>,
    description: Option<String>,
    #[serde(alias = "rewards")]
    reward: Option<RawReward>,
    #[serde(default)]
    turn_in: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawReward {
    xp: Option<i64>,
    gold: Option<i64>,
    #[serde(default)]
    items: Vec<RawItemReward>,
}

#[derive(Debug, Deserialize)]
struct RawItemReward {
    id: Option<String>,
    quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDialogue {
    Lines(Vec<String>),
    Line(String),
}

/// Parse a `dialogue` property: a JSON array of lines, or a single plain line.
///
/// Missing or empty input yields the placeholder line.
///
/// ```
/// use questline_data::parse_dialogue;
///
/// assert_eq!(parse_dialogue(Some(r#"["Hi.", "Bye."]"#)), vec!["Hi.", "Bye."]);
/// assert_eq!(parse_dialogue(Some("Just one line")), vec!["Just one line"]);
/// assert_eq!(parse_dialogue(None), vec!["..."]);
/// ```
pub fn parse_dialogue(raw: Option<&str>) -> Vec<String> {
    let lines = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Vec::new(),
        Some(text) => match serde_json::from_str::<RawDialogue>(text) {
            Ok(RawDialogue::Lines(lines)) => lines,
            Ok(RawDialogue::Line(line)) => vec![line],
            Err(_) => vec![text.to_string()],
        },
    };
    if lines.is_empty() {
        vec![PLACEHOLDER_LINE.to_string()]
    } else {
        lines
    }
}

/// Parse a `path` property: a JSON array of `{x, y}` or `"x,y;x,y"`.
///
/// Points that do not parse are dropped rather than failing the NPC.
pub fn parse_path(raw: Option<&str>) -> Vec<Waypoint> {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    if let Ok(points) = serde_json::from_str::<Vec<Waypoint>>(text) {
        return points;
    }
    text.split(';')
        .filter_map(|pair| {
            let (x, y) = pair.split_once(',')?;
            let x = x.trim().parse::<f32>().ok()?;
            let y = y.trim().parse::<f32>().ok()?;
            (x.is_finite() && y.is_finite()).then_some(Waypoint { x, y })
        })
        .collect()
}

/// Parse a `quest` property into a validated [`QuestDef`].
///
/// `fallback_id` is used when the metadata omits an id (normally the NPC name).
///
/// # Errors
/// Returns [`DefinitionError::MalformedDefinition`] when the JSON does not
/// parse, the type is unknown, the target is empty, or a count is not positive.
///
/// ```
/// use questline_data::{QuestKind, parse_quest};
///
/// let quest = parse_quest(r#"{"type":"kill","target":"slime","targetCount":2}"#, "npc_guard").unwrap();
/// assert_eq!(quest.id, "npc_guard");
/// assert_eq!(quest.kind, QuestKind::Kill);
/// assert_eq!(quest.count, 2);
/// assert!(parse_quest("{not json", "npc_guard").is_err());
/// ```
pub fn parse_quest(raw: &str, fallback_id: &str) -> Result<QuestDef, DefinitionError> {
    let context = format!("quest for '{fallback_id}'");
    let parsed: RawQuestDef =
        serde_json::from_str(raw.trim()).map_err(|e| DefinitionError::malformed(&context, e.to_string()))?;

    let id = non_empty(parsed.id).unwrap_or_else(|| fallback_id.trim().to_string());
    if id.is_empty() {
        return Err(DefinitionError::malformed(&context, "missing id"));
    }
    let context = format!("quest '{id}'");

    let kind = match parsed.kind.as_deref() {
        None => QuestKind::Collect,
        Some(key) => QuestKind::from_key(key)
            .ok_or_else(|| DefinitionError::malformed(&context, format!("unknown quest type '{key}'")))?,
    };
    let target = non_empty(parsed.target).ok_or_else(|| DefinitionError::malformed(&context, "missing target"))?;
    let count = match parsed.count.or(parsed.target_count) {
        None => 1,
        Some(n) => positive(n).ok_or_else(|| DefinitionError::malformed(&context, format!("count must be positive, got {n}")))?,
    };

    let description = non_empty(parsed.description).unwrap_or_default();
    let title = non_empty(parsed.title)
        .or_else(|| (!description.is_empty()).then(|| description.clone()))
        .unwrap_or_else(|| id.clone());

    let reward = match parsed.reward {
        None => RewardDef::default(),
        Some(raw) => parse_reward(raw, &context)?,
    };

    Ok(QuestDef {
        id,
        kind,
        target,
        count,
        title,
        description,
        reward,
        turn_in: parsed.turn_in,
    })
}

fn parse_reward(raw: RawReward, context: &str) -> Result<RewardDef, DefinitionError> {
    let xp = non_negative(raw.xp.unwrap_or(0))
        .ok_or_else(|| DefinitionError::malformed(context, "reward xp must not be negative"))?;
    let gold = non_negative(raw.gold.unwrap_or(0))
        .ok_or_else(|| DefinitionError::malformed(context, "reward gold must not be negative"))?;
    let items = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let id: Id = non_empty(item.id)
                .ok_or_else(|| DefinitionError::malformed(context, format!("reward item {idx} has no id")))?;
            let quantity = match item.quantity {
                None => 1,
                Some(n) => positive(n).ok_or_else(|| {
                    DefinitionError::malformed(context, format!("reward item '{id}' quantity must be positive"))
                })?,
            };
            Ok(ItemRewardDef { id, quantity })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RewardDef { xp, gold, items })
}

impl NpcDef {
    /// Build an NPC from a map object.
    ///
    /// Returns `Ok(None)` for objects that are not NPCs: an NPC is named `npc…`
    /// or carries a `dialogue` or `quest` property.
    ///
    /// # Errors
    /// Propagates a malformed `quest` property.
    pub fn from_object(obj: &MapObject) -> Result<Option<NpcDef>, DefinitionError> {
        let dialogue_prop = obj.property("dialogue");
        let quest_prop = obj.property("quest");
        if !(obj.name.to_lowercase().starts_with("npc") || dialogue_prop.is_some() || quest_prop.is_some()) {
            return Ok(None);
        }

        let name = if obj.name.trim().is_empty() {
            format!("npc_{}", obj.id)
        } else {
            obj.name.clone()
        };
        let quest = quest_prop.map(|raw| parse_quest(raw, &name)).transpose()?;

        Ok(Some(NpcDef {
            dialogue: parse_dialogue(dialogue_prop),
            path: parse_path(obj.property("path")),
            quest,
            name,
        }))
    }
}

/// Build every NPC found among `objects`.
///
/// An NPC whose quest metadata is malformed is still returned, without its
/// quest, and the error is collected alongside.
pub fn npcs_from_objects(objects: &[MapObject]) -> (Vec<NpcDef>, Vec<DefinitionError>) {
    let mut npcs = Vec::new();
    let mut errors = Vec::new();
    for obj in objects {
        match NpcDef::from_object(obj) {
            Ok(Some(npc)) => npcs.push(npc),
            Ok(None) => {},
            Err(err) => {
                let stripped = MapObject {
                    properties: obj.properties.iter().filter(|p| p.name != "quest").cloned().collect(),
                    ..obj.clone()
                };
                if let Ok(Some(npc)) = NpcDef::from_object(&stripped) {
                    npcs.push(npc);
                }
                errors.push(err);
            },
        }
    }
    (npcs, errors)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn positive(n: i64) -> Option<u32> {
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn non_negative(n: i64) -> Option<u32> {
    u32::try_from(n).ok()
}
