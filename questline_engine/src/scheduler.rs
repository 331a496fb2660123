//! Delayed Action Scheduler
//!
//! Cosmetic follow-ups (such as opening dialogue a moment after a quest is
//! forced to complete) are queued here against the arbitrator's clock, in
//! milliseconds. Nothing queued here gates a ledger mutation; each action
//! re-checks its preconditions when it fires.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use log::info;
use questline_data::NpcDef;

/// Work the arbitrator can defer.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredAction {
    /// Open dialogue with `npc`, if nothing else is going on by then.
    StartDialogue { npc: NpcDef },
}

/// An action due at a particular time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAction {
    pub due_ms: u64,
    pub action: DeferredAction,
    pub note: Option<String>,
}

/// Heap entry ordered by `(due_ms, seq)` only.
#[derive(Debug, Clone)]
struct Queued {
    seq: u64,
    scheduled: ScheduledAction,
}

impl Queued {
    fn key(&self) -> (u64, u64) {
        (self.scheduled.due_ms, self.seq)
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<Queued>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` to fire `delay_ms` after `now_ms`.
    pub fn schedule_in(&mut self, now_ms: u64, delay_ms: u64, action: DeferredAction, note: Option<String>) {
        let due_ms = now_ms.saturating_add(delay_ms);
        let log_msg = note.as_deref().unwrap_or("<no note provided>");
        info!("scheduling action (now/due = {now_ms}/{due_ms} ms): \"{log_msg}\"");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Queued {
            seq,
            scheduled: ScheduledAction { due_ms, action, note },
        }));
    }

    /// Pop the next due action, if any.
    ///
    /// Returns `None` when the earliest action is still in the future. Actions
    /// due at the same time come out in the order they were scheduled.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<ScheduledAction> {
        if self.heap.peek()?.0.scheduled.due_ms > now_ms {
            return None;
        }
        self.heap.pop().map(|Reverse(queued)| queued.scheduled)
    }

    /// Number of actions still waiting.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
