//! Inventory Ledger
//!
//! Item-id → count ledger. Items are plain ids with a count; an id whose count
//! drops to zero is removed, so absence and zero are the same thing.
//! Every mutation is written through to the store and announced on the bus.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::info;

use crate::bus::{EventBus, GameEvent, InventoryChange};
use crate::error::LedgerError;
use crate::storage::{SaveStore, load_document, save_document};

/// Default storage key for the inventory document.
pub const INVENTORY_KEY: &str = "rpg_inventory_v1";

const LABEL: &str = "inventory";

pub struct InventoryLedger {
    items: RefCell<BTreeMap<String, u32>>,
    store: Rc<dyn SaveStore>,
    key: String,
    bus: EventBus,
}

impl fmt::Debug for InventoryLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryLedger")
            .field("key", &self.key)
            .field("items", &self.items.borrow())
            .finish_non_exhaustive()
    }
}

impl InventoryLedger {
    /// Open the ledger stored under `key`, starting empty if nothing usable is saved.
    pub fn open(store: Rc<dyn SaveStore>, key: impl Into<String>, bus: EventBus) -> Self {
        let key = key.into();
        let mut items: BTreeMap<String, u32> = load_document(store.as_ref(), &key, LABEL);
        items.retain(|id, qty| !id.is_empty() && *qty > 0);
        info!("inventory loaded from '{key}' with {} item kind(s)", items.len());
        Self {
            items: RefCell::new(items),
            store,
            key,
            bus,
        }
    }

    /// Add `qty` of `id` and return the new count.
    ///
    /// # Errors
    /// [`LedgerError::InvalidArgument`] for an empty id or a zero quantity.
    pub fn add_item(&self, id: &str, qty: u32) -> Result<u32, LedgerError> {
        if id.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("item id is empty".to_string()));
        }
        if qty == 0 {
            return Err(LedgerError::InvalidArgument(format!("quantity for '{id}' must be positive")));
        }

        let new_count = {
            let mut items = self.items.borrow_mut();
            let count = items.entry(id.to_string()).or_insert(0);
            *count = count.saturating_add(qty);
            *count
        };
        info!("inventory: +{qty} {id} (now {new_count})");
        self.persist();
        self.bus.publish(GameEvent::InventoryChanged(InventoryChange::Item {
            id: id.to_string(),
            qty: new_count,
        }));
        self.bus.publish(GameEvent::Notice {
            text: format!("+{qty} {id}"),
        });
        Ok(new_count)
    }

    /// Remove `qty` of `id`. Returns false, changing nothing, when fewer are held.
    pub fn remove_item(&self, id: &str, qty: u32) -> bool {
        if id.is_empty() || qty == 0 || !self.has_item(id, qty) {
            return false;
        }

        let remaining = {
            let mut items = self.items.borrow_mut();
            let remaining = items.get(id).copied().unwrap_or(0) - qty;
            if remaining == 0 {
                items.remove(id);
            } else {
                items.insert(id.to_string(), remaining);
            }
            remaining
        };
        info!("inventory: -{qty} {id} (now {remaining})");
        self.persist();
        self.bus.publish(GameEvent::InventoryChanged(InventoryChange::Item {
            id: id.to_string(),
            qty: remaining,
        }));
        true
    }

    pub fn has_item(&self, id: &str, qty: u32) -> bool {
        self.count(id) >= qty
    }

    /// Held count of `id`, zero if absent.
    pub fn count(&self, id: &str) -> u32 {
        self.items.borrow().get(id).copied().unwrap_or(0)
    }

    /// Snapshot of every held item. Changing the copy does not touch the ledger.
    pub fn all(&self) -> BTreeMap<String, u32> {
        self.items.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.items.borrow_mut().clear();
        info!("inventory cleared");
        self.persist();
        self.bus.publish(GameEvent::InventoryChanged(InventoryChange::Cleared));
    }

    fn persist(&self) {
        let snapshot = self.items.borrow().clone();
        save_document(self.store.as_ref(), &self.key, LABEL, &snapshot);
    }
}
