use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// The three kinds of asset the forge produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[serde(alias = "magic_item")]
    Item,
    Npc,
    Tavern,
}

/// A named column of a saved entry, in display/export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Item, AssetKind::Npc, AssetKind::Tavern];

    /// Parse "item", "npc" or "tavern" (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "item" | "items" | "magic_item" | "magic-item" => Some(Self::Item),
            "npc" | "npcs" => Some(Self::Npc),
            "tavern" | "taverns" => Some(Self::Tavern),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Npc => "npc",
            Self::Tavern => "tavern",
        }
    }

    /// Key under which saved entries of this kind are persisted.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Item => "savedMagicItems",
            Self::Npc => "savedNpcs",
            Self::Tavern => "savedTaverns",
        }
    }

    /// Noun used in user-facing messages ("Generate an NPC first!").
    pub fn noun(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Npc => "NPC",
            Self::Tavern => "tavern",
        }
    }

    /// "an item", "an NPC", "a tavern".
    pub fn with_article(self) -> &'static str {
        match self {
            Self::Item => "an item",
            Self::Npc => "an NPC",
            Self::Tavern => "a tavern",
        }
    }

    pub fn concealed(self) -> Column {
        match self {
            Self::Item => Column { key: "curse", label: "Curse" },
            Self::Npc => Column { key: "secret", label: "Secret" },
            Self::Tavern => Column { key: "rumor", label: "Rumor" },
        }
    }

    /// Visible columns followed by the concealed one.
    pub fn columns(self) -> Vec<Column> {
        let mut columns = match self {
            Self::Item => columns_of::<ItemField>(),
            Self::Npc => columns_of::<NpcField>(),
            Self::Tavern => columns_of::<TavernField>(),
        };
        columns.push(self.concealed());
        columns
    }

    /// Body columns: everything except name and subtitle, concealed last.
    pub fn body_columns(self) -> Vec<Column> {
        self.columns()
            .into_iter()
            .filter(|c| c.key != "name" && c.key != "subtitle")
            .collect()
    }

    /// Column after which summaries draw a `---` rule.
    pub fn section_break_after(self) -> &'static str {
        match self {
            Self::Item => "powers",
            Self::Npc => "details",
            Self::Tavern => "signatureDrink",
        }
    }

    pub fn history_title(self) -> &'static str {
        match self {
            Self::Item => "Saved Magic Items",
            Self::Npc => "Saved NPCs",
            Self::Tavern => "Saved Taverns",
        }
    }

    pub fn document_title(self) -> &'static str {
        match self {
            Self::Item => "InstantForge Item History",
            Self::Npc => "InstantForge NPC History",
            Self::Tavern => "InstantForge Tavern History",
        }
    }
}

fn columns_of<F: FieldSet>() -> Vec<Column> {
    F::ALL
        .iter()
        .map(|f| Column {
            key: f.key(),
            label: f.label(),
        })
        .collect()
}

/// An enumerated set of visible record fields for one asset kind.
///
/// The concealed bonus field is deliberately not a member, so it can never
/// be locked.
pub trait FieldSet: Copy + Eq + Hash + Debug + 'static {
    const KIND: AssetKind;
    const ALL: &'static [Self];

    fn key(self) -> &'static str;
    fn label(self) -> &'static str;
    fn lockable(self) -> bool;

    /// Label used in the plain-text clipboard summary.
    fn copy_label(self) -> &'static str {
        self.label()
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Name,
    Subtitle,
    Description,
    Powers,
    History,
}

impl FieldSet for ItemField {
    const KIND: AssetKind = AssetKind::Item;
    const ALL: &'static [Self] = &[
        Self::Name,
        Self::Subtitle,
        Self::Description,
        Self::Powers,
        Self::History,
    ];

    fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Subtitle => "subtitle",
            Self::Description => "description",
            Self::Powers => "powers",
            Self::History => "history",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Subtitle => "Subtitle",
            Self::Description => "Description",
            Self::Powers => "Powers",
            Self::History => "History",
        }
    }

    fn lockable(self) -> bool {
        matches!(self, Self::Name | Self::Description | Self::History)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpcField {
    Name,
    Subtitle,
    Appearance,
    Details,
    VoiceMannerism,
    Hook,
    GoalOffer,
}

impl FieldSet for NpcField {
    const KIND: AssetKind = AssetKind::Npc;
    const ALL: &'static [Self] = &[
        Self::Name,
        Self::Subtitle,
        Self::Appearance,
        Self::Details,
        Self::VoiceMannerism,
        Self::Hook,
        Self::GoalOffer,
    ];

    fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Subtitle => "subtitle",
            Self::Appearance => "appearance",
            Self::Details => "details",
            Self::VoiceMannerism => "voiceMannerism",
            Self::Hook => "hook",
            Self::GoalOffer => "goalOffer",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Subtitle => "Subtitle",
            Self::Appearance => "Appearance",
            Self::Details => "Details",
            Self::VoiceMannerism => "Voice & Mannerism",
            Self::Hook => "Hook",
            Self::GoalOffer => "Goal & Offer",
        }
    }

    fn lockable(self) -> bool {
        matches!(self, Self::Name | Self::Appearance | Self::Details)
    }

    fn copy_label(self) -> &'static str {
        match self {
            Self::VoiceMannerism => "Voice",
            other => other.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TavernField {
    Name,
    Subtitle,
    Description,
    Innkeeper,
    SignatureDrink,
    Patrons,
}

impl FieldSet for TavernField {
    const KIND: AssetKind = AssetKind::Tavern;
    const ALL: &'static [Self] = &[
        Self::Name,
        Self::Subtitle,
        Self::Description,
        Self::Innkeeper,
        Self::SignatureDrink,
        Self::Patrons,
    ];

    fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Subtitle => "subtitle",
            Self::Description => "description",
            Self::Innkeeper => "innkeeper",
            Self::SignatureDrink => "signatureDrink",
            Self::Patrons => "patrons",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Subtitle => "Subtitle",
            Self::Description => "Description",
            Self::Innkeeper => "Innkeeper",
            Self::SignatureDrink => "Signature Drink",
            Self::Patrons => "Patrons",
        }
    }

    fn lockable(self) -> bool {
        matches!(self, Self::Name | Self::Description | Self::SignatureDrink)
    }
}
