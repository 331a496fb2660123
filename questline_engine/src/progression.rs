//! Player progression: experience, gold and stashed reward items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The player's accumulated rewards.
///
/// Values only ever grow, and only through quest rewards. `inventory` holds
/// reward items granted while no inventory ledger is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gold: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inventory: BTreeMap<String, u32>,
}

impl Progression {
    pub fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Stash a reward item on the player record. Returns the new count.
    pub fn stash_item(&mut self, id: &str, quantity: u32) -> u32 {
        let count = self.inventory.entry(id.to_string()).or_insert(0);
        *count = count.saturating_add(quantity);
        *count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additions_saturate() {
        let mut p = Progression::default();
        p.add_xp(10);
        p.add_gold(u32::MAX);
        p.add_gold(5);
        assert_eq!(p.xp, 10);
        assert_eq!(p.gold, u32::MAX);
    }

    #[test]
    fn stash_accumulates() {
        let mut p = Progression::default();
        assert_eq!(p.stash_item("potion", 1), 1);
        assert_eq!(p.stash_item("potion", 2), 3);
    }

    #[test]
    fn document_shape() {
        let p: Progression = serde_json::from_str(r#"{"xp":5}"#).unwrap();
        assert_eq!(p.gold, 0);
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"xp":5,"gold":0}"#);
    }
}
