//! Interaction Arbitrator
//!
//! Decides what an interact or advance key-press means right now. The
//! arbitrator owns exactly one [`InteractionMode`] at a time:
//!
//! | mode             | interact                                  | advance        | accept / decline   |
//! |------------------|-------------------------------------------|----------------|--------------------|
//! | `Idle`           | offer, forced completion, or dialogue     | ignored        | ignored            |
//! | `OfferPending`   | ignored                                   | ignored        | resolve the offer  |
//! | `DialogueActive` | ignored                                   | next line/end  | ignored            |
//!
//! An open offer blocks everything except accept/decline so the player can't
//! skip the decision by mashing through dialogue.

use std::mem;
use std::rc::Rc;

use log::{debug, info};
use questline_data::{NpcDef, QuestDef};
use variantly::Variantly;

use crate::bus::{EventBus, GameEvent};
use crate::config::InteractionConfig;
use crate::dialogue::DialoguePlayer;
use crate::quest::{QuestLedger, QuestStatus};
use crate::scheduler::{DeferredAction, Scheduler};

/// The single interaction currently in progress.
#[derive(Debug, Clone, Default, PartialEq, Variantly)]
pub enum InteractionMode {
    #[default]
    Idle,
    DialogueActive { npc: NpcDef },
    OfferPending { npc: NpcDef, quest: QuestDef },
}

/// What an input did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The input meant nothing in the current mode.
    Ignored,
    OfferShown { npc: String, quest_id: String },
    DialogueStarted { npc: String },
    DialogueAdvanced { npc: String, index: usize },
    DialogueEnded { npc: String },
    /// A satisfied quest was completed on approach; dialogue follows after a delay.
    QuestTurnedIn { npc: String, quest_id: String },
    /// `accepted` is false if the ledger refused the quest.
    OfferAccepted { quest_id: String, accepted: bool },
    OfferDeclined { quest_id: String },
}

impl Transition {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Transition::Ignored)
    }
}

pub struct Arbitrator {
    quests: Rc<QuestLedger>,
    bus: EventBus,
    settings: InteractionConfig,
    mode: InteractionMode,
    dialogue: DialoguePlayer,
    scheduler: Scheduler,
    clock_ms: u64,
}

impl Arbitrator {
    pub fn new(quests: Rc<QuestLedger>, bus: EventBus, settings: InteractionConfig) -> Self {
        Self {
            quests,
            bus,
            settings,
            mode: InteractionMode::Idle,
            dialogue: DialoguePlayer::new(),
            scheduler: Scheduler::new(),
            clock_ms: 0,
        }
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// The NPC being dealt with, if any.
    pub fn current_npc(&self) -> Option<&NpcDef> {
        match &self.mode {
            InteractionMode::Idle => None,
            InteractionMode::DialogueActive { npc } | InteractionMode::OfferPending { npc, .. } => Some(npc),
        }
    }

    /// Line to display while dialogue is open.
    pub fn current_line(&self) -> Option<&str> {
        if self.mode.is_dialogue_active() {
            self.dialogue.current_line()
        } else {
            None
        }
    }

    pub fn dialogue(&self) -> &DialoguePlayer {
        &self.dialogue
    }

    /// Milliseconds of game time seen through [`tick`](Self::tick).
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Deferred actions that have not fired yet.
    pub fn pending_actions(&self) -> usize {
        self.scheduler.pending()
    }

    /// Text for the offer box while an offer is pending.
    pub fn offer_lines(&self) -> Option<Vec<String>> {
        let InteractionMode::OfferPending { quest, .. } = &self.mode else {
            return None;
        };
        let body = if quest.description.trim().is_empty() {
            quest.describe_objective()
        } else {
            quest.description.clone()
        };
        Some(vec![
            quest.display_title().to_string(),
            String::new(),
            body,
            String::new(),
            "(Y) Accept · (N) Decline".to_string(),
        ])
    }

    /// The player pressed interact, with `npc` in range (or nobody).
    pub fn on_interact_pressed(&mut self, npc: Option<&NpcDef>) -> Transition {
        if !self.mode.is_idle() {
            debug!("interact ignored: already busy");
            return Transition::Ignored;
        }
        let Some(npc) = npc else {
            return Transition::Ignored;
        };

        if let Some(quest) = &npc.quest {
            match self.quests.status(&quest.id) {
                QuestStatus::Unknown => {
                    info!("offering quest '{}' from {}", quest.id, npc.name);
                    let transition = Transition::OfferShown {
                        npc: npc.name.clone(),
                        quest_id: quest.id.clone(),
                    };
                    self.mode = InteractionMode::OfferPending {
                        npc: npc.clone(),
                        quest: quest.clone(),
                    };
                    return transition;
                },
                QuestStatus::Active if self.quests.is_ready(&quest.id) => {
                    let completed = if self.quests.needs_turn_in(&quest.id) {
                        self.quests.try_turn_in(&quest.id)
                    } else {
                        self.quests.check_completion(&quest.id)
                    };
                    if completed {
                        self.scheduler.schedule_in(
                            self.clock_ms,
                            self.settings.completion_dialogue_delay_ms,
                            DeferredAction::StartDialogue { npc: npc.clone() },
                            Some(format!("dialogue with {} after turning in '{}'", npc.name, quest.id)),
                        );
                        return Transition::QuestTurnedIn {
                            npc: npc.name.clone(),
                            quest_id: quest.id.clone(),
                        };
                    }
                    debug!("quest '{}' is ready but did not complete", quest.id);
                },
                QuestStatus::Active | QuestStatus::Completed => {},
            }
        }

        self.start_dialogue(npc)
    }

    /// The player pressed the advance key.
    pub fn on_advance_pressed(&mut self) -> Transition {
        let InteractionMode::DialogueActive { npc } = &self.mode else {
            return Transition::Ignored;
        };
        let name = npc.name.clone();
        if self.dialogue.advance() {
            return Transition::DialogueAdvanced {
                npc: name,
                index: self.dialogue.index(),
            };
        }

        self.mode = InteractionMode::Idle;
        self.dialogue.reset();
        info!("dialogue with {name} ended");
        self.bus.publish(GameEvent::DialogueEnded { npc: name.clone() });
        Transition::DialogueEnded { npc: name }
    }

    /// Accept the pending offer.
    pub fn on_offer_accept(&mut self) -> Transition {
        if !self.mode.is_offer_pending() {
            return Transition::Ignored;
        }
        let InteractionMode::OfferPending { quest, .. } = mem::take(&mut self.mode) else {
            return Transition::Ignored;
        };
        let quest_id = quest.id.clone();
        let accepted = self.quests.accept_quest(quest);
        Transition::OfferAccepted { quest_id, accepted }
    }

    /// Decline the pending offer. The quest stays unknown and can be offered again.
    pub fn on_offer_decline(&mut self) -> Transition {
        if !self.mode.is_offer_pending() {
            return Transition::Ignored;
        }
        let InteractionMode::OfferPending { npc, quest } = mem::take(&mut self.mode) else {
            return Transition::Ignored;
        };
        info!("{} declined quest '{}'", npc.name, quest.id);
        Transition::OfferDeclined { quest_id: quest.id }
    }

    /// Advance the clock by `delta_ms` and run whatever deferred actions fell due.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<Transition> {
        self.clock_ms = self.clock_ms.saturating_add(delta_ms);
        let mut fired = Vec::new();
        while let Some(scheduled) = self.scheduler.pop_due(self.clock_ms) {
            match scheduled.action {
                DeferredAction::StartDialogue { npc } => {
                    if self.mode.is_idle() {
                        fired.push(self.start_dialogue(&npc));
                    } else {
                        info!("dropping deferred dialogue with {}: interaction already in progress", npc.name);
                    }
                },
            }
        }
        fired
    }

    fn start_dialogue(&mut self, npc: &NpcDef) -> Transition {
        self.dialogue
            .start_with_placeholder(&npc.dialogue, &self.settings.placeholder_line);
        self.mode = InteractionMode::DialogueActive { npc: npc.clone() };
        info!("dialogue with {} started ({} line(s))", npc.name, self.dialogue.len());
        self.bus.publish(GameEvent::DialogueStarted { npc: npc.name.clone() });
        Transition::DialogueStarted { npc: npc.name.clone() }
    }
}
