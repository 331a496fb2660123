#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! Shared data model for questline content.
//!
//! Everything the world layer hands to the engine passes through here first:
//! map objects are parsed into [`NpcDef`]s and [`QuestDef`]s, and the engine
//! never has to re-check the loosely typed metadata they came from.

pub mod defs;
pub mod parse;
pub mod validate;

pub use defs::*;
pub use parse::{DefinitionError, npcs_from_objects, parse_dialogue, parse_path, parse_quest};
pub use validate::{ValidationError, validate_npcs, validate_quest};
