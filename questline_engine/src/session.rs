//! One player's wired-up game state.
//!
//! `GameSession` builds the bus, both ledgers and the arbitrator from a single
//! configuration and store, the way a game scene would on boot.

use std::rc::Rc;

use log::info;

use crate::arbitrator::Arbitrator;
use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::error::LedgerError;
use crate::inventory::InventoryLedger;
use crate::quest::QuestLedger;
use crate::storage::SaveStore;

#[derive(Debug)]
pub struct PickupOutcome {
    /// Inventory count after the pickup.
    pub held: u32,
    /// Active quests the pickup advanced.
    pub quests_advanced: usize,
}

pub struct GameSession {
    pub bus: EventBus,
    pub inventory: Rc<InventoryLedger>,
    pub quests: Rc<QuestLedger>,
    pub arbitrator: Arbitrator,
}

impl GameSession {
    /// Load both ledgers from `store` and wire them together.
    pub fn open(config: &EngineConfig, store: Rc<dyn SaveStore>) -> Self {
        let bus = EventBus::new();
        let inventory = Rc::new(InventoryLedger::open(
            Rc::clone(&store),
            config.storage.inventory_key.clone(),
            bus.clone(),
        ));
        let quests = Rc::new(
            QuestLedger::open(store, config.storage.quest_key.clone(), bus.clone())
                .with_inventory(Rc::clone(&inventory)),
        );
        let arbitrator = Arbitrator::new(Rc::clone(&quests), bus.clone(), config.interaction.clone());
        info!("game session ready");
        Self {
            bus,
            inventory,
            quests,
            arbitrator,
        }
    }

    /// The player walked over a collectible: bank it, then tell the quest log.
    ///
    /// # Errors
    /// [`LedgerError::InvalidArgument`] for an empty item id.
    pub fn pickup(&self, item_id: &str) -> Result<PickupOutcome, LedgerError> {
        let held = self.inventory.add_item(item_id, 1)?;
        let quests_advanced = self.quests.report_collected(item_id, 1)?;
        Ok(PickupOutcome { held, quests_advanced })
    }

    /// An enemy died.
    ///
    /// # Errors
    /// [`LedgerError::InvalidArgument`] for an empty target id.
    pub fn defeat(&self, target_id: &str) -> Result<usize, LedgerError> {
        self.quests.report_killed(target_id, 1)
    }
}
