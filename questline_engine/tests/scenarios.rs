use std::cell::RefCell;
use std::rc::Rc;

use questline_data::{MapObject, NpcDef, ObjectProperty, QuestDef, QuestKind, RewardDef, npcs_from_objects};
use questline_engine as qe;
use qe::{EngineConfig, EventKind, GameEvent, GameSession, InteractionMode, MemoryStore, QuestStatus, Transition};

fn session() -> (GameSession, Rc<MemoryStore>) {
    let store = Rc::new(MemoryStore::new());
    (GameSession::open(&EngineConfig::default(), store.clone()), store)
}

fn herb_quest() -> QuestDef {
    QuestDef::new("q1", QuestKind::Collect, "herb")
        .with_count(3)
        .with_reward(RewardDef {
            xp: 10,
            ..RewardDef::default()
        })
}

fn record_events(bus: &qe::EventBus) -> Rc<RefCell<Vec<GameEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    bus.subscribe_all(move |e| l.borrow_mut().push(e.clone()));
    log
}

#[test]
fn collect_quest_completes_after_three_reports() {
    let (s, _) = session();
    assert!(s.quests.accept_quest(herb_quest()));
    for _ in 0..3 {
        s.quests.report_collected("herb", 1).expect("report");
    }
    assert!(s.quests.is_completed("q1"));
    assert!(!s.quests.is_active("q1"));
    assert_eq!(s.quests.player().xp, 10);
    assert!(s.quests.active_list().is_empty());
}

#[test]
fn insufficient_removal_is_refused() {
    let (s, _) = session();
    s.inventory.add_item("herb", 2).expect("add");
    assert!(!s.inventory.remove_item("herb", 5));
    assert_eq!(s.inventory.count("herb"), 2);
}

#[test]
fn offer_ignores_advance_and_decline_leaves_quest_unknown() {
    let (mut s, _) = session();
    let npc = NpcDef::new("npc_elder", vec!["Hello.".into()]).with_quest(herb_quest());

    assert!(matches!(s.arbitrator.on_interact_pressed(Some(&npc)), Transition::OfferShown { .. }));
    assert!(s.arbitrator.mode().is_offer_pending());
    assert_eq!(s.arbitrator.on_advance_pressed(), Transition::Ignored);
    assert!(s.arbitrator.mode().is_offer_pending());

    assert_eq!(
        s.arbitrator.on_offer_decline(),
        Transition::OfferDeclined { quest_id: "q1".into() }
    );
    assert_eq!(*s.arbitrator.mode(), InteractionMode::Idle);
    assert_eq!(s.quests.status("q1"), QuestStatus::Unknown);

    // declined offers come back
    assert!(matches!(s.arbitrator.on_interact_pressed(Some(&npc)), Transition::OfferShown { .. }));
}

#[test]
fn three_line_dialogue_ends_on_fourth_advance() {
    let (mut s, _) = session();
    let events = record_events(&s.bus);
    let npc = NpcDef::new("npc_bard", vec!["One.".into(), "Two.".into(), "Three.".into()]);

    s.arbitrator.on_interact_pressed(Some(&npc));
    assert_eq!(s.arbitrator.dialogue().index(), 0);
    assert!(matches!(s.arbitrator.on_advance_pressed(), Transition::DialogueAdvanced { index: 1, .. }));
    assert!(matches!(s.arbitrator.on_advance_pressed(), Transition::DialogueAdvanced { index: 2, .. }));
    assert_eq!(s.arbitrator.current_line(), Some("Three."));
    assert_eq!(
        s.arbitrator.on_advance_pressed(),
        Transition::DialogueEnded { npc: "npc_bard".into() }
    );
    assert!(s.arbitrator.mode().is_idle());

    let kinds: Vec<EventKind> = events.borrow().iter().map(GameEvent::kind).collect();
    assert_eq!(kinds, vec![EventKind::DialogueStarted, EventKind::DialogueEnded]);
}

#[test]
fn turn_in_without_items_changes_nothing() {
    let (s, _) = session();
    s.quests.accept_quest(herb_quest().with_turn_in(true));
    s.quests.report_collected("herb", 3).expect("report");
    s.inventory.add_item("herb", 1).expect("add");

    assert!(!s.quests.try_turn_in("q1"));
    assert!(s.quests.is_active("q1"));
    assert_eq!(s.quests.progress("q1"), Some((3, 3)));
    assert_eq!(s.inventory.count("herb"), 1);
}

#[test]
fn states_stay_mutually_exclusive() {
    let (s, _) = session();
    let ids = ["q1", "k1", "k2"];
    s.quests.accept_quest(herb_quest());
    s.quests.accept_quest(QuestDef::new("k1", QuestKind::Kill, "slime").with_count(2));
    s.quests.accept_quest(QuestDef::new("k2", QuestKind::Kill, "slime"));

    let check = || {
        for id in ids {
            assert!(!(s.quests.is_active(id) && s.quests.is_completed(id)), "{id} in both states");
        }
    };
    check();
    s.quests.report_killed("slime", 1).expect("kill");
    check();
    assert!(s.quests.is_completed("k2"));
    assert!(!s.quests.accept_quest(QuestDef::new("k2", QuestKind::Kill, "slime")));
    s.quests.report_killed("slime", 1).expect("kill");
    s.quests.report_collected("herb", 3).expect("collect");
    check();
    assert_eq!(s.quests.completed_ids(), vec!["k1", "k2", "q1"]);
}

#[test]
fn progress_is_the_sum_of_matching_reports() {
    let (s, _) = session();
    s.quests.accept_quest(QuestDef::new("big", QuestKind::Kill, "bat").with_count(10));
    let events = record_events(&s.bus);
    for amount in [1, 3, 2] {
        s.quests.report_killed("bat", amount).expect("kill");
        s.quests.report_killed("rat", amount).expect("kill");
    }
    assert_eq!(s.quests.progress("big"), Some((6, 10)));

    let progress: Vec<u32> = events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            GameEvent::QuestProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 4, 6]);
}

#[test]
fn completion_event_order() {
    let (s, _) = session();
    s.quests.accept_quest(QuestDef::new("k", QuestKind::Kill, "bat").with_title("Bats"));
    let events = record_events(&s.bus);
    s.quests.report_killed("bat", 1).expect("kill");
    assert_eq!(
        *events.borrow(),
        vec![
            GameEvent::QuestProgress {
                id: "k".into(),
                progress: 1,
                required: 1
            },
            GameEvent::QuestCompleted {
                id: "k".into(),
                definition: QuestDef::new("k", QuestKind::Kill, "bat").with_title("Bats"),
            },
            GameEvent::Notice {
                text: "Quest complete: Bats".into()
            },
        ]
    );
}

#[test]
fn hook_failure_does_not_block_later_ticks() {
    let (mut s, _) = session();
    s.quests.set_completion_hook(|id, _| anyhow::bail!("no toast layer for {id}"));
    let npc = NpcDef::new("npc_elder", vec!["Thanks.".into()])
        .with_quest(QuestDef::new("k", QuestKind::Kill, "slime"));
    s.arbitrator.on_interact_pressed(Some(&npc));
    s.arbitrator.on_offer_accept();
    s.defeat("slime").expect("kill");
    assert!(s.quests.is_completed("k"));

    assert!(matches!(s.arbitrator.on_interact_pressed(Some(&npc)), Transition::DialogueStarted { .. }));
    assert!(matches!(s.arbitrator.on_advance_pressed(), Transition::DialogueEnded { .. }));
}

#[test]
fn persistence_failure_keeps_play_going() {
    let (s, store) = session();
    store.set_fail_writes(true);
    assert!(s.quests.accept_quest(herb_quest()));
    s.pickup("herb").expect("pickup");
    assert_eq!(s.quests.progress("q1"), Some((1, 3)));
    assert_eq!(s.inventory.count("herb"), 1);
    assert_eq!(store.document("rpg_save_v1"), None);
}

#[test]
fn map_metadata_drives_a_full_encounter() {
    let prop = |name: &str, value: &str| ObjectProperty {
        name: name.into(),
        value: value.into(),
    };
    let objects = vec![
        MapObject {
            id: 7,
            name: "npc_healer".into(),
            properties: vec![
                prop("dialogue", r#"["Bring herbs.", "Thank you!"]"#),
                prop(
                    "quest",
                    r#"{"id":"herbalist","type":"collect","target":"herb","count":2,"turnIn":true,"reward":{"items":[{"id":"potion"}]}}"#,
                ),
            ],
            ..MapObject::default()
        },
        MapObject {
            id: 8,
            name: "chest".into(),
            ..MapObject::default()
        },
    ];
    let (npcs, errors) = npcs_from_objects(&objects);
    assert!(errors.is_empty());
    assert_eq!(npcs.len(), 1);
    let healer = &npcs[0];

    let (mut s, _) = session();
    s.arbitrator.on_interact_pressed(Some(healer));
    assert_eq!(
        s.arbitrator.on_offer_accept(),
        Transition::OfferAccepted {
            quest_id: "herbalist".into(),
            accepted: true
        }
    );
    s.pickup("herb").expect("pickup");
    s.pickup("herb").expect("pickup");
    assert!(s.quests.is_ready("herbalist"));

    assert!(matches!(s.arbitrator.on_interact_pressed(Some(healer)), Transition::QuestTurnedIn { .. }));
    assert_eq!(s.inventory.count("herb"), 0);
    assert_eq!(s.inventory.count("potion"), 1);

    let fired = s.arbitrator.tick(EngineConfig::default().interaction.completion_dialogue_delay_ms);
    assert_eq!(fired, vec![Transition::DialogueStarted { npc: "npc_healer".into() }]);
    assert_eq!(s.arbitrator.current_line(), Some("Bring herbs."));
}

#[test]
fn satisfied_save_record_completes_when_talking_to_the_giver() {
    let store = Rc::new(MemoryStore::new());
    store.insert_raw(
        "rpg_save_v1",
        r#"{"active":{"q":{"definition":{"id":"q","type":"collect","target":"herb","count":2},"progress":2}}}"#,
    );
    let mut s = GameSession::open(&EngineConfig::default(), store);
    let npc = NpcDef::new("npc", vec!["Well done.".into()]).with_quest(QuestDef::new("q", QuestKind::Collect, "herb").with_count(2));

    assert_eq!(
        s.arbitrator.on_interact_pressed(Some(&npc)),
        Transition::QuestTurnedIn {
            npc: "npc".into(),
            quest_id: "q".into()
        }
    );
    assert_eq!(s.quests.status("q"), QuestStatus::Completed);
}
