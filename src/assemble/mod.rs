//! One assembler per asset kind, each driving the shared picker, recency
//! guard and template compositor against its own fragment table.

pub mod item;
pub mod npc;
pub mod tavern;

pub use item::{ItemAssembler, ItemFilters, ItemResolved};
pub use npc::{NpcAssembler, NpcFilters, NpcResolved};
pub use tavern::{TavernAssembler, TavernFilters, TavernResolved};

/// Upper-case the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
