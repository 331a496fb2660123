#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** questline_replay **
//! Runs a scripted play-through of NPC metadata against the engine and prints
//! every transition and bus event. Handy when authoring map objects.
//!
//! Script format (TOML):
//!
//! ```toml
//! [[objects]]
//! id = 1
//! name = "npc_elder"
//! properties = [
//!     { name = "dialogue", value = '["Hello there.", "Slimes everywhere..."]' },
//!     { name = "quest", value = '{"id":"slimes","type":"kill","target":"slime","count":2,"reward":{"xp":20}}' },
//! ]
//!
//! [[steps]]
//! action = "interact"
//! npc = "npc_elder"
//!
//! [[steps]]
//! action = "accept"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use log::{info, warn};
use questline_data::{MapObject, NpcDef, npcs_from_objects, validate_npcs};
use questline_engine::slots::format_modified;
use questline_engine::{
    EngineConfig, GameEvent, GameSession, InventoryChange, MemoryStore, SaveSlots, SaveStore, Transition, load_config,
};
use serde::Deserialize;
use textwrap::{fill, termwidth};

#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    objects: Vec<MapObject>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Step {
    Interact {
        #[serde(default)]
        npc: Option<String>,
    },
    Advance,
    Accept,
    Decline,
    Pickup {
        item: String,
    },
    Kill {
        target: String,
    },
    TurnIn {
        quest: String,
    },
    Wait {
        ms: u64,
    },
}

struct Args {
    script: PathBuf,
    config: Option<PathBuf>,
    slot: Option<String>,
}

fn main() -> Result<()> {
    let args = parse_args(env::args().skip(1).collect());
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.filter.as_str())).init();
    info!("Start: replaying '{}'", args.script.display());

    let script = load_script(&args.script)?;
    let (npcs, problems) = npcs_from_objects(&script.objects);
    for problem in &problems {
        warn!("{problem}");
        println!("{} {problem}", "definition error:".red());
    }
    for problem in validate_npcs(&npcs) {
        println!("{} {problem}", "validation:".yellow());
    }

    let store: Rc<dyn SaveStore> = match &args.slot {
        Some(slot) => {
            let slots = SaveSlots::new(&config.storage.dir);
            for existing in slots.list()? {
                let age = existing.modified.map_or_else(|| "unknown".to_string(), format_modified);
                println!("{} {} ({age})", "slot:".dimmed(), existing.name);
            }
            Rc::new(slots.open(slot)?)
        },
        None => Rc::new(MemoryStore::new()),
    };

    let mut session = GameSession::open(&config, store);
    session.bus.subscribe_all(print_event);

    for (n, step) in script.steps.iter().enumerate() {
        println!("{}", format!("── step {} : {step:?}", n + 1).bright_blue());
        run_step(&mut session, &npcs, step)?;
    }

    print_summary(&session);
    Ok(())
}

fn usage() -> ! {
    eprintln!("Usage:\n  questline_replay <script.toml> [--config <config.toml>] [--slot <name>]");
    process::exit(2);
}

fn parse_args(args: Vec<String>) -> Args {
    let mut script = None;
    let mut config = None;
    let mut slot = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(iter.next().unwrap_or_else(|| usage()))),
            "--slot" => slot = Some(iter.next().unwrap_or_else(|| usage())),
            "--" => {},
            flag if flag.starts_with("--") => usage(),
            _ if script.is_none() => script = Some(PathBuf::from(&arg)),
            _ => usage(),
        }
    }
    let Some(script) = script else { usage() };
    Args { script, config, slot }
}

fn load_script(path: &Path) -> Result<ReplayScript> {
    let text = fs::read_to_string(path).with_context(|| format!("reading replay script '{}'", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing replay script '{}'", path.display()))
}

fn find_npc<'a>(npcs: &'a [NpcDef], name: &str) -> Result<&'a NpcDef> {
    match npcs.iter().find(|n| n.name == name) {
        Some(npc) => Ok(npc),
        None => bail!("script refers to unknown npc '{name}'"),
    }
}

fn run_step(session: &mut GameSession, npcs: &[NpcDef], step: &Step) -> Result<()> {
    let transitions = match step {
        Step::Interact { npc } => {
            let npc = npc.as_deref().map(|name| find_npc(npcs, name)).transpose()?;
            vec![session.arbitrator.on_interact_pressed(npc)]
        },
        Step::Advance => vec![session.arbitrator.on_advance_pressed()],
        Step::Accept => vec![session.arbitrator.on_offer_accept()],
        Step::Decline => vec![session.arbitrator.on_offer_decline()],
        Step::Pickup { item } => {
            let outcome = session.pickup(item)?;
            println!("  holding {} {item}, {} quest(s) advanced", outcome.held, outcome.quests_advanced);
            Vec::new()
        },
        Step::Kill { target } => {
            let advanced = session.defeat(target)?;
            println!("  {advanced} quest(s) advanced");
            Vec::new()
        },
        Step::TurnIn { quest } => {
            let ok = session.quests.try_turn_in(quest);
            println!("  turn-in of '{quest}': {}", if ok { "accepted".green() } else { "refused".red() });
            Vec::new()
        },
        Step::Wait { ms } => session.arbitrator.tick(*ms),
    };

    for transition in transitions {
        print_transition(&transition);
    }
    if let Some(line) = session.arbitrator.current_line() {
        println!("  {}", fill(&format!("“{line}”"), termwidth().saturating_sub(4)).italic());
    }
    if let Some(lines) = session.arbitrator.offer_lines() {
        for line in lines {
            println!("  │ {line}");
        }
    }
    Ok(())
}

fn print_transition(transition: &Transition) {
    if transition.is_ignored() {
        println!("  {}", "(ignored)".dimmed());
    } else {
        println!("  {} {transition:?}", "→".bright_green());
    }
}

fn print_event(event: &GameEvent) {
    let text = match event {
        GameEvent::InventoryChanged(InventoryChange::Item { id, qty }) => format!("inventory: {id} = {qty}"),
        GameEvent::InventoryChanged(InventoryChange::Cleared) => "inventory cleared".to_string(),
        GameEvent::QuestAccepted { id, .. } => format!("quest accepted: {id}"),
        GameEvent::QuestProgress { id, progress, required } => format!("quest progress: {id} {progress}/{required}"),
        GameEvent::QuestCompleted { id, .. } => format!("quest completed: {id}"),
        GameEvent::DialogueStarted { npc } => format!("dialogue started: {npc}"),
        GameEvent::DialogueEnded { npc } => format!("dialogue ended: {npc}"),
        GameEvent::Notice { text } => format!("notice: {text}"),
    };
    println!("  {} {}", format!("[{}]", event.kind()).cyan(), text);
}

fn print_summary(session: &GameSession) {
    println!("\n{}", "QUEST LOG".bright_yellow().underline());
    let active = session.quests.active_list();
    if active.is_empty() {
        println!("  (no active quests)");
    }
    for quest in active.iter() {
        println!(
            "  {} [{}] {}/{}  {}",
            quest.title.bold(),
            quest.kind,
            quest.progress,
            quest.required,
            quest.description.dimmed()
        );
    }
    drop(active);
    for id in session.quests.completed_ids() {
        println!("  {} {id}", "✓".green());
    }

    let player = session.quests.player();
    println!("\n{} xp {}  gold {}", "PLAYER".bright_yellow().underline(), player.xp, player.gold);

    println!("\n{}", "INVENTORY".bright_yellow().underline());
    let items = session.inventory.all();
    if items.is_empty() {
        println!("  (empty)");
    }
    for (id, qty) in items {
        println!("  {id:<16} × {qty}");
    }
}
