//! Quest Ledger
//!
//! Tracks which quests are active and completed, advances progress from world
//! events, and applies rewards when a quest finishes. A quest id moves
//! `Unknown → Active → Completed` and never leaves `Completed`, so a finished
//! quest can never be offered or accepted again in the same save.
//!
//! All operations take `&self`; state lives behind a `RefCell` whose borrow is
//! always released before anything is published, so bus handlers and the
//! completion hook may read (or even mutate) the ledger they are reacting to.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use log::{debug, error, info, warn};
use questline_data::{QuestDef, QuestKind, validate_quest};

use crate::bus::{EventBus, GameEvent};
use crate::error::LedgerError;
use crate::inventory::InventoryLedger;
use crate::now_millis;
use crate::progression::Progression;
use crate::quest::record::{ActiveQuestView, CompletedQuest, QuestBook, QuestRecord, QuestStatus};
use crate::storage::{SaveStore, load_document, save_document};

/// Default storage key for the quest document.
pub const QUEST_KEY: &str = "rpg_save_v1";

const LABEL: &str = "quests";

/// Presentation callback run after a quest completes. Errors and panics are
/// logged and otherwise ignored.
type CompletionHook = Rc<dyn Fn(&str, &QuestDef) -> anyhow::Result<()>>;

pub struct QuestLedger {
    book: RefCell<QuestBook>,
    store: Rc<dyn SaveStore>,
    key: String,
    bus: EventBus,
    inventory: Option<Rc<InventoryLedger>>,
    on_completed: RefCell<Option<CompletionHook>>,
}

impl fmt::Debug for QuestLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestLedger")
            .field("key", &self.key)
            .field("book", &self.book.borrow())
            .field("inventory", &self.inventory.is_some())
            .finish_non_exhaustive()
    }
}

impl QuestLedger {
    /// Open the quest document stored under `key`.
    ///
    /// A missing or corrupt document yields an empty ledger.
    pub fn open(store: Rc<dyn SaveStore>, key: impl Into<String>, bus: EventBus) -> Self {
        let key = key.into();
        let mut book: QuestBook = load_document(store.as_ref(), &key, LABEL);
        let repaired = book.repair();
        if repaired.unnamed > 0 {
            warn!("{LABEL}: dropped {} active record(s) without an id", repaired.unnamed);
        }
        if repaired.already_completed > 0 {
            warn!(
                "{LABEL}: dropped {} active record(s) that were also completed",
                repaired.already_completed
            );
        }
        info!(
            "quests loaded from '{key}': {} active, {} completed",
            book.active.len(),
            book.completed.len()
        );
        Self {
            book: RefCell::new(book),
            store,
            key,
            bus,
            inventory: None,
            on_completed: RefCell::new(None),
        }
    }

    /// Attach an inventory for turn-in checks and item rewards.
    #[must_use]
    pub fn with_inventory(mut self, inventory: Rc<InventoryLedger>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn inventory(&self) -> Option<&Rc<InventoryLedger>> {
        self.inventory.as_ref()
    }

    /// Install the completion hook, replacing any previous one.
    pub fn set_completion_hook(&self, hook: impl Fn(&str, &QuestDef) -> anyhow::Result<()> + 'static) {
        *self.on_completed.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn clear_completion_hook(&self) {
        self.on_completed.borrow_mut().take();
    }

    /// Start tracking `definition`.
    ///
    /// Returns false, changing nothing, if the definition is invalid or the
    /// quest is already active or completed.
    pub fn accept_quest(&self, definition: QuestDef) -> bool {
        let problems = validate_quest(&definition);
        if !problems.is_empty() {
            for problem in &problems {
                warn!("rejecting quest '{}': {problem}", definition.id);
            }
            return false;
        }

        let id = definition.id.clone();
        let title = definition.display_title().to_string();
        {
            let mut book = self.book.borrow_mut();
            match book.status(&id) {
                QuestStatus::Unknown => {},
                status => {
                    debug!("accept of quest '{id}' ignored: already {status}");
                    return false;
                },
            }
            book.active.push(QuestRecord::new(definition.clone(), now_millis()));
        }
        info!("quest accepted: '{id}' ({title})");
        self.persist();
        self.bus.publish(GameEvent::QuestAccepted { id, definition });
        self.bus.publish(GameEvent::Notice {
            text: format!("Quest accepted: {title}"),
        });
        true
    }

    /// Record `amount` pickups of `item_id`. Returns how many quests advanced.
    ///
    /// # Errors
    /// [`LedgerError::InvalidArgument`] for an empty id or zero amount.
    pub fn report_collected(&self, item_id: &str, amount: u32) -> Result<usize, LedgerError> {
        self.report(QuestKind::Collect, item_id, amount)
    }

    /// Record `amount` kills of `target_id`. Returns how many quests advanced.
    ///
    /// # Errors
    /// [`LedgerError::InvalidArgument`] for an empty id or zero amount.
    pub fn report_killed(&self, target_id: &str, amount: u32) -> Result<usize, LedgerError> {
        self.report(QuestKind::Kill, target_id, amount)
    }

    fn report(&self, kind: QuestKind, target: &str, amount: u32) -> Result<usize, LedgerError> {
        if target.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(format!("{kind} target is empty")));
        }
        if amount == 0 {
            return Err(LedgerError::InvalidArgument(format!("{kind} amount for '{target}' must be positive")));
        }

        let updates: Vec<(String, u32, u32)> = {
            let mut book = self.book.borrow_mut();
            book.active
                .iter_mut()
                .filter(|r| r.definition.matches(kind, target))
                .map(|r| {
                    r.progress = r.progress.saturating_add(amount);
                    (r.id().to_string(), r.progress, r.required())
                })
                .collect()
        };
        if updates.is_empty() {
            debug!("{kind} '{target}' x{amount} matched no active quest");
            return Ok(0);
        }

        self.persist();
        for (id, progress, required) in &updates {
            info!("quest progress: '{id}' {progress}/{required}");
            self.bus.publish(GameEvent::QuestProgress {
                id: id.clone(),
                progress: *progress,
                required: *required,
            });
        }
        for (id, _, _) in &updates {
            self.maybe_complete(id);
        }
        Ok(updates.len())
    }

    /// Hand in a quest explicitly.
    ///
    /// A collect quest with an inventory attached needs the required count of
    /// its target in the inventory; those items are consumed and the quest
    /// completes. Any other quest completes only if its progress is already
    /// sufficient. Returns false when nothing happened.
    pub fn try_turn_in(&self, id: &str) -> bool {
        let Some(definition) = self.book.borrow().find_active(id).map(|r| r.definition.clone()) else {
            debug!("turn-in of '{id}' ignored: not active");
            return false;
        };

        match (definition.kind, &self.inventory) {
            (QuestKind::Collect, Some(inventory)) => {
                let needed = definition.required();
                if !inventory.remove_item(&definition.target, needed) {
                    debug!(
                        "turn-in of '{id}' refused: holding {} of {needed} {}",
                        inventory.count(&definition.target),
                        definition.target
                    );
                    return false;
                }
                self.complete(id)
            },
            _ => self.maybe_complete(id),
        }
    }

    /// True if `id` is active and would complete on turn-in or on its own.
    pub fn is_ready(&self, id: &str) -> bool {
        self.book.borrow().find_active(id).is_some_and(QuestRecord::is_satisfied)
    }

    /// True if `id` is active and only completes through [`try_turn_in`](Self::try_turn_in).
    pub fn needs_turn_in(&self, id: &str) -> bool {
        self.book
            .borrow()
            .find_active(id)
            .is_some_and(|r| self.awaits_turn_in(&r.definition))
    }

    /// Complete `id` if its progress is sufficient and it is not waiting for a
    /// hand-in. Returns true if the quest completed.
    pub fn check_completion(&self, id: &str) -> bool {
        self.maybe_complete(id)
    }

    /// A collect quest that waits for an explicit hand-in.
    fn awaits_turn_in(&self, definition: &QuestDef) -> bool {
        definition.kind == QuestKind::Collect && definition.turn_in && self.inventory.is_some()
    }

    fn maybe_complete(&self, id: &str) -> bool {
        let ready = {
            let book = self.book.borrow();
            book.find_active(id)
                .is_some_and(|r| r.is_satisfied() && !self.awaits_turn_in(&r.definition))
        };
        ready && self.complete(id)
    }

    /// Move `id` from active to completed and pay out its reward.
    fn complete(&self, id: &str) -> bool {
        let (definition, stashed) = {
            let mut book = self.book.borrow_mut();
            let Some(pos) = book.active.iter().position(|r| r.id() == id) else {
                return false;
            };
            let definition = book.active.remove(pos).definition;
            book.completed.insert(
                id.to_string(),
                CompletedQuest {
                    completed_at: now_millis(),
                    definition: definition.clone(),
                },
            );
            book.player.add_xp(definition.reward.xp);
            book.player.add_gold(definition.reward.gold);
            let mut stashed = Vec::new();
            if self.inventory.is_none() {
                for item in &definition.reward.items {
                    book.player.stash_item(&item.id, item.quantity);
                    stashed.push((item.id.clone(), item.quantity));
                }
            }
            (definition, stashed)
        };

        if let Some(inventory) = &self.inventory {
            for item in &definition.reward.items {
                if let Err(err) = inventory.add_item(&item.id, item.quantity) {
                    error!("quest '{id}': could not grant reward item '{}': {err}", item.id);
                }
            }
        }
        self.persist();

        let title = definition.display_title().to_string();
        info!(
            "quest completed: '{id}' ({title}); +{} xp, +{} gold",
            definition.reward.xp, definition.reward.gold
        );
        self.bus.publish(GameEvent::QuestCompleted {
            id: id.to_string(),
            definition: definition.clone(),
        });
        self.bus.publish(GameEvent::Notice {
            text: format!("Quest complete: {title}"),
        });
        for (item, qty) in stashed {
            self.bus.publish(GameEvent::Notice {
                text: format!("Received {qty} × {item}"),
            });
        }
        self.run_completion_hook(id, &definition);
        true
    }

    fn run_completion_hook(&self, id: &str, definition: &QuestDef) {
        let Some(hook) = self.on_completed.borrow().clone() else {
            return;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| hook(id, definition))) {
            Ok(Ok(())) => {},
            Ok(Err(err)) => error!("completion hook failed for quest '{id}': {err:#}"),
            Err(_) => error!("completion hook panicked for quest '{id}'"),
        }
    }

    pub fn status(&self, id: &str) -> QuestStatus {
        self.book.borrow().status(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.status(id) == QuestStatus::Active
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.status(id) == QuestStatus::Completed
    }

    /// `(progress, required)` for an active quest.
    pub fn progress(&self, id: &str) -> Option<(u32, u32)> {
        self.book.borrow().find_active(id).map(|r| (r.progress, r.required()))
    }

    /// Snapshot of the player's rewards so far.
    pub fn player(&self) -> Progression {
        self.book.borrow().player.clone()
    }

    /// Completed quest ids, sorted.
    pub fn completed_ids(&self) -> Vec<String> {
        self.book.borrow().completed.keys().cloned().collect()
    }

    /// Borrowed view of the active quests in acceptance order.
    ///
    /// The view holds a borrow of the ledger; drop it before mutating.
    pub fn active_list(&self) -> ActiveQuests<'_> {
        ActiveQuests {
            book: self.book.borrow(),
        }
    }

    fn persist(&self) {
        let book = self.book.borrow();
        save_document(self.store.as_ref(), &self.key, LABEL, &*book);
    }
}

/// Lazy quest-log view returned by [`QuestLedger::active_list`].
pub struct ActiveQuests<'a> {
    book: Ref<'a, QuestBook>,
}

impl ActiveQuests<'_> {
    pub fn iter(&self) -> impl Iterator<Item = ActiveQuestView<'_>> {
        self.book.active.iter().map(ActiveQuestView::from)
    }

    pub fn len(&self) -> usize {
        self.book.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.book.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventKind;
    use crate::inventory::INVENTORY_KEY;
    use crate::storage::MemoryStore;
    use questline_data::{ItemRewardDef, RewardDef};
    use std::cell::Cell;

    struct Fixture {
        store: Rc<MemoryStore>,
        bus: EventBus,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Rc::new(MemoryStore::new()),
                bus: EventBus::new(),
            }
        }

        fn quests(&self) -> QuestLedger {
            QuestLedger::open(self.store.clone(), QUEST_KEY, self.bus.clone())
        }

        fn inventory(&self) -> Rc<InventoryLedger> {
            Rc::new(InventoryLedger::open(self.store.clone(), INVENTORY_KEY, self.bus.clone()))
        }
    }

    fn herbs(count: u32) -> QuestDef {
        QuestDef::new("q1", QuestKind::Collect, "herb")
            .with_count(count)
            .with_title("Herbalist")
            .with_reward(RewardDef {
                xp: 10,
                ..RewardDef::default()
            })
    }

    #[test]
    fn accept_is_idempotent() {
        let fx = Fixture::new();
        let quests = fx.quests();
        assert!(quests.accept_quest(herbs(3)));
        assert!(!quests.accept_quest(herbs(3)));
        assert_eq!(quests.active_list().len(), 1);
        assert_eq!(quests.status("q1"), QuestStatus::Active);
    }

    #[test]
    fn invalid_definition_is_rejected() {
        let fx = Fixture::new();
        let quests = fx.quests();
        assert!(!quests.accept_quest(QuestDef::new("", QuestKind::Kill, "slime")));
        assert!(!quests.accept_quest(QuestDef::new("q", QuestKind::Kill, "")));
        assert!(quests.active_list().is_empty());
        assert_eq!(fx.store.document(QUEST_KEY), None);
    }

    #[test]
    fn collect_completes_and_rewards() {
        let fx = Fixture::new();
        let quests = fx.quests();
        quests.accept_quest(herbs(3));
        for _ in 0..3 {
            assert_eq!(quests.report_collected("herb", 1).unwrap(), 1);
        }
        assert!(quests.is_completed("q1"));
        assert!(!quests.is_active("q1"));
        assert_eq!(quests.player().xp, 10);
        assert!(!quests.accept_quest(herbs(3)));
    }

    #[test]
    fn report_rejects_bad_input() {
        let fx = Fixture::new();
        let quests = fx.quests();
        assert!(quests.report_killed("", 1).is_err());
        assert!(quests.report_killed("slime", 0).is_err());
        assert_eq!(quests.report_killed("slime", 1).unwrap(), 0);
    }

    #[test]
    fn one_kill_advances_every_matching_quest() {
        let fx = Fixture::new();
        let quests = fx.quests();
        quests.accept_quest(QuestDef::new("a", QuestKind::Kill, "slime").with_count(2));
        quests.accept_quest(QuestDef::new("b", QuestKind::Kill, "slime").with_count(3));
        quests.accept_quest(QuestDef::new("c", QuestKind::Collect, "slime").with_count(3));
        assert_eq!(quests.report_killed("slime", 1).unwrap(), 2);
        assert_eq!(quests.progress("a"), Some((1, 2)));
        assert_eq!(quests.progress("b"), Some((1, 3)));
        assert_eq!(quests.progress("c"), Some((0, 3)));
    }

    #[test]
    fn gated_collect_waits_for_turn_in() {
        let fx = Fixture::new();
        let inventory = fx.inventory();
        let quests = fx.quests().with_inventory(Rc::clone(&inventory));
        quests.accept_quest(herbs(2).with_turn_in(true));

        inventory.add_item("herb", 1).unwrap();
        quests.report_collected("herb", 1).unwrap();
        assert!(!quests.try_turn_in("q1"));
        assert_eq!(quests.progress("q1"), Some((1, 2)));

        inventory.add_item("herb", 1).unwrap();
        quests.report_collected("herb", 1).unwrap();
        assert!(quests.is_active("q1"));
        assert!(quests.is_ready("q1"));

        assert!(quests.try_turn_in("q1"));
        assert!(quests.is_completed("q1"));
        assert_eq!(inventory.count("herb"), 0);
    }

    #[test]
    fn kill_turn_in_is_a_completion_check() {
        let fx = Fixture::new();
        let quests = fx.quests().with_inventory(fx.inventory());
        quests.accept_quest(QuestDef::new("k", QuestKind::Kill, "bat").with_count(2));
        assert!(!quests.try_turn_in("k"));
        quests.report_killed("bat", 2).unwrap();
        assert!(quests.is_completed("k"));
        assert!(!quests.try_turn_in("k"));
    }

    #[test]
    fn reward_items_route_through_inventory() {
        let fx = Fixture::new();
        let inventory = fx.inventory();
        let quests = fx.quests().with_inventory(Rc::clone(&inventory));
        let reward = RewardDef {
            xp: 5,
            gold: 7,
            items: vec![ItemRewardDef::new("potion", 2)],
        };
        quests.accept_quest(QuestDef::new("k", QuestKind::Kill, "bat").with_reward(reward));
        quests.report_killed("bat", 1).unwrap();
        assert_eq!(inventory.count("potion"), 2);
        let player = quests.player();
        assert_eq!((player.xp, player.gold), (5, 7));
        assert!(player.inventory.is_empty());
    }

    #[test]
    fn reward_items_stash_without_inventory() {
        let fx = Fixture::new();
        let quests = fx.quests();
        let notices = Rc::new(RefCell::new(Vec::new()));
        let n = Rc::clone(&notices);
        fx.bus.subscribe(EventKind::Notice, move |e| {
            if let GameEvent::Notice { text } = e {
                n.borrow_mut().push(text.clone());
            }
        });
        let reward = RewardDef {
            items: vec![ItemRewardDef::new("potion", 1)],
            ..RewardDef::default()
        };
        quests.accept_quest(QuestDef::new("k", QuestKind::Kill, "bat").with_title("Bats").with_reward(reward));
        quests.report_killed("bat", 1).unwrap();
        assert_eq!(quests.player().inventory.get("potion"), Some(&1));
        assert_eq!(
            *notices.borrow(),
            vec!["Quest accepted: Bats", "Quest complete: Bats", "Received 1 × potion"]
        );
    }

    #[test]
    fn failing_hook_does_not_undo_completion() {
        let fx = Fixture::new();
        let quests = fx.quests();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        quests.set_completion_hook(move |_, _| {
            c.set(c.get() + 1);
            anyhow::bail!("toast layer missing")
        });
        quests.accept_quest(herbs(1));
        quests.accept_quest(QuestDef::new("q2", QuestKind::Collect, "herb"));
        quests.report_collected("herb", 1).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(quests.is_completed("q1"));
        assert!(quests.is_completed("q2"));
        assert_eq!(quests.player().xp, 10);
    }

    #[test]
    fn panicking_hook_is_contained() {
        let fx = Fixture::new();
        let quests = fx.quests();
        quests.set_completion_hook(|_, _| panic!("hook exploded"));
        quests.accept_quest(herbs(1));
        quests.report_collected("herb", 1).unwrap();
        assert!(quests.is_completed("q1"));
    }

    #[test]
    fn handlers_see_committed_state() {
        let fx = Fixture::new();
        let quests = Rc::new(fx.quests());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (q, s) = (Rc::clone(&quests), Rc::clone(&seen));
        fx.bus.subscribe(EventKind::QuestCompleted, move |e| {
            if let GameEvent::QuestCompleted { id, .. } = e {
                s.borrow_mut().push((q.is_active(id), q.is_completed(id)));
            }
        });
        quests.accept_quest(herbs(1));
        quests.report_collected("herb", 1).unwrap();
        assert_eq!(*seen.borrow(), vec![(false, true)]);
    }

    #[test]
    fn active_list_keeps_acceptance_order() {
        let fx = Fixture::new();
        let quests = fx.quests();
        quests.accept_quest(QuestDef::new("zeta", QuestKind::Kill, "bat"));
        quests.accept_quest(QuestDef::new("alpha", QuestKind::Kill, "rat").with_count(4));
        let list = quests.active_list();
        let ids: Vec<_> = list.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        let alpha = list.iter().nth(1).unwrap();
        assert_eq!((alpha.progress, alpha.required), (0, 4));
    }

    #[test]
    fn state_survives_reopen() {
        let fx = Fixture::new();
        let quests = fx.quests();
        quests.accept_quest(herbs(3));
        quests.report_collected("herb", 2).unwrap();
        quests.accept_quest(QuestDef::new("k", QuestKind::Kill, "bat").with_reward(RewardDef {
            gold: 3,
            ..RewardDef::default()
        }));
        quests.report_killed("bat", 1).unwrap();

        let reopened = fx.quests();
        assert_eq!(reopened.progress("q1"), Some((2, 3)));
        assert!(reopened.is_completed("k"));
        assert_eq!(reopened.player().gold, 3);
        assert_eq!(reopened.completed_ids(), vec!["k".to_string()]);
    }
}
