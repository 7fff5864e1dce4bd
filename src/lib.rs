//! InstantForge: tabletop-RPG content generation for magic items, NPCs and
//! taverns.
//!
//! Fragment tables feed one assembler per asset kind. Assemblers combine a
//! uniform picker, a per-category recency guard and a small template
//! compositor into records with one concealed bonus field. Records can be
//! locked field by field, saved to a key-value store and exported.

pub mod assemble;
pub mod core;
pub mod export;
pub mod schema;
pub mod store;
pub mod workbench;

pub use crate::core::assembler::{AssembleError, Assembled, Assembler, Locks};
pub use crate::core::session::{ForgeConfig, Session};
pub use crate::schema::fields::{AssetKind, FieldSet, ItemField, NpcField, TavernField};
pub use crate::schema::record::{Concealed, Record, SavedEntry};
pub use crate::schema::tables::{FragmentTable, ItemTable, NpcTable, TableError, TavernTable};
pub use crate::workbench::{Workbench, WorkbenchError};
