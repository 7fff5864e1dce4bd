/// Fragment tables: the static, read-only data each assembler draws from.
///
/// Tables are authored as RON (see `forge_data/`) or fetched by the page as
/// JSON; both use the same field names.

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::fields::AssetKind;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind:?} table has an empty '{list}' list")]
    EmptyCategoryList { kind: AssetKind, list: &'static str },
}

/// Loading and validation shared by every table type.
pub trait FragmentTable: DeserializeOwned + Sized {
    const KIND: AssetKind;

    /// Check that the top-level category lists can be picked from.
    fn validate(&self) -> Result<(), TableError>;

    fn parse_ron(input: &str) -> Result<Self, TableError> {
        let table: Self = ron::from_str(input)?;
        table.validate()?;
        info!("loaded {:?} fragment table (RON)", Self::KIND);
        Ok(table)
    }

    fn parse_json(input: &str) -> Result<Self, TableError> {
        let table: Self = serde_json::from_str(input)?;
        table.validate()?;
        info!("loaded {:?} fragment table (JSON)", Self::KIND);
        Ok(table)
    }

    fn load_from_ron(path: &Path) -> Result<Self, TableError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }
}

fn require(kind: AssetKind, list: &'static str, items: &[String]) -> Result<(), TableError> {
    if items.is_empty() {
        Err(TableError::EmptyCategoryList { kind, list })
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Magic items
// ---------------------------------------------------------------------------

/// A named power with its rules text. The name feeds `{effectWord}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Power {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeData {
    #[serde(default)]
    pub name_templates: Vec<String>,
    #[serde(default)]
    pub subtypes: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub creator_names: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub visuals: Vec<String>,
    /// Powers keyed by power level (tier).
    #[serde(default)]
    pub powers: HashMap<String, Vec<Power>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTable {
    pub types: Vec<String>,
    pub power_levels: Vec<String>,
    #[serde(default)]
    pub item_data: HashMap<String, ItemTypeData>,
    #[serde(default)]
    pub creators: Vec<String>,
    #[serde(default)]
    pub histories: Vec<String>,
    #[serde(default)]
    pub curses: Vec<String>,
}

impl ItemTable {
    /// Powers for a (type, tier) combination, if there are any.
    pub fn powers(&self, item_type: &str, tier: &str) -> Option<&[Power]> {
        self.item_data
            .get(item_type)?
            .powers
            .get(tier)
            .map(Vec::as_slice)
            .filter(|p| !p.is_empty())
    }

    /// Every (type, tier) pair with no usable powers.
    pub fn missing_combinations(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for item_type in &self.types {
            for tier in &self.power_levels {
                if self.powers(item_type, tier).is_none() {
                    missing.push((item_type.clone(), tier.clone()));
                }
            }
        }
        missing
    }
}

impl FragmentTable for ItemTable {
    const KIND: AssetKind = AssetKind::Item;

    fn validate(&self) -> Result<(), TableError> {
        require(Self::KIND, "types", &self.types)?;
        require(Self::KIND, "powerLevels", &self.power_levels)
    }
}

// ---------------------------------------------------------------------------
// NPCs
// ---------------------------------------------------------------------------

/// Syllable fragments for races without name lists. Pattern letters
/// `P`, `M` and `S` select prefix, middle and suffix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameSyllables {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default)]
    pub middle: Vec<String>,
    #[serde(default)]
    pub suffix: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraitPool {
    #[serde(default)]
    pub physical: Vec<String>,
    #[serde(default)]
    pub clothing: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppearanceData {
    #[serde(default)]
    pub shared: TraitPool,
    /// Extra traits keyed by gender.
    #[serde(default)]
    pub gender: HashMap<String, TraitPool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceData {
    /// First names keyed by gender.
    #[serde(default)]
    pub names: HashMap<String, Vec<String>>,
    #[serde(default, rename = "name_syllables")]
    pub name_syllables: Option<NameSyllables>,
    #[serde(default)]
    pub last_names: Vec<String>,
    #[serde(default)]
    pub appearance: AppearanceData,
}

/// Job-specific hook/goal/offer pools. Empty pools fall back to the
/// table's global ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFlavor {
    #[serde(default)]
    pub hooks: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub offers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcTable {
    pub races: Vec<String>,
    pub jobs: Vec<String>,
    #[serde(default)]
    pub data: HashMap<String, RaceData>,
    #[serde(default)]
    pub personalities: Vec<String>,
    #[serde(default)]
    pub quirks: Vec<String>,
    #[serde(default)]
    pub voices: Vec<String>,
    #[serde(default)]
    pub mannerisms: Vec<String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub job_flavor: HashMap<String, JobFlavor>,
    #[serde(default)]
    pub global_hooks: Vec<String>,
    #[serde(default)]
    pub global_goals: Vec<String>,
    #[serde(default)]
    pub global_offers: Vec<String>,
}

impl NpcTable {
    /// Race data usable for a full NPC (at least one last name).
    pub fn race(&self, race: &str) -> Option<&RaceData> {
        self.data.get(race).filter(|d| !d.last_names.is_empty())
    }

    pub fn missing_races(&self) -> Vec<String> {
        self.races
            .iter()
            .filter(|r| self.race(r).is_none())
            .cloned()
            .collect()
    }

    fn flavor_pool<'a>(
        &'a self,
        job: &str,
        select: fn(&JobFlavor) -> &Vec<String>,
        global: &'a [String],
    ) -> &'a [String] {
        match self.job_flavor.get(job).map(select) {
            Some(pool) if !pool.is_empty() => pool,
            _ => global,
        }
    }

    pub fn hooks_for(&self, job: &str) -> &[String] {
        self.flavor_pool(job, |f| &f.hooks, &self.global_hooks)
    }

    pub fn goals_for(&self, job: &str) -> &[String] {
        self.flavor_pool(job, |f| &f.goals, &self.global_goals)
    }

    pub fn offers_for(&self, job: &str) -> &[String] {
        self.flavor_pool(job, |f| &f.offers, &self.global_offers)
    }
}

impl FragmentTable for NpcTable {
    const KIND: AssetKind = AssetKind::Npc;

    fn validate(&self) -> Result<(), TableError> {
        require(Self::KIND, "races", &self.races)?;
        require(Self::KIND, "jobs", &self.jobs)
    }
}

// ---------------------------------------------------------------------------
// Taverns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TavernNameTemplates {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub nouns: Vec<String>,
    #[serde(default)]
    pub noun2: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub owner_names: Vec<String>,
    #[serde(default)]
    pub establishments: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InnkeeperPools {
    #[serde(default)]
    pub personalities: Vec<String>,
    #[serde(default)]
    pub quirks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TavernTable {
    pub types: Vec<String>,
    pub qualities: Vec<String>,
    #[serde(default)]
    pub name_templates: TavernNameTemplates,
    /// Descriptions keyed by tavern type, then quality.
    #[serde(default)]
    pub descriptions: HashMap<String, HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub innkeepers: InnkeeperPools,
    /// Drinks keyed by quality.
    #[serde(default, rename = "signature_drinks")]
    pub signature_drinks: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub patrons: Vec<String>,
    #[serde(default)]
    pub rumors: Vec<String>,
}

impl TavernTable {
    /// Types with no descriptions entry at all. Generation never settles
    /// on these; it re-randomizes the type instead.
    pub fn undescribed_types(&self) -> Vec<&str> {
        self.types
            .iter()
            .filter(|t| !self.descriptions.contains_key(*t))
            .map(String::as_str)
            .collect()
    }

    /// (type, quality) pairs of described types with no description for
    /// that quality, which generate the fallback text.
    pub fn missing_descriptions(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for tavern_type in &self.types {
            let Some(by_quality) = self.descriptions.get(tavern_type) else {
                continue;
            };
            for quality in &self.qualities {
                let present = by_quality.get(quality).is_some_and(|d| !d.is_empty());
                if !present {
                    missing.push((tavern_type.clone(), quality.clone()));
                }
            }
        }
        missing
    }
}

impl FragmentTable for TavernTable {
    const KIND: AssetKind = AssetKind::Tavern;

    fn validate(&self) -> Result<(), TableError> {
        require(Self::KIND, "types", &self.types)?;
        require(Self::KIND, "qualities", &self.qualities)
    }
}
