/// Tavern assembler, plus the heuristics that turn a tavern's innkeeper and
/// patrons into queued NPC requests.

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::assembler::{
    resolve_category, with_retries, AssembleError, Assembled, Assembler, Locks,
};
use crate::core::session::Session;
use crate::core::template::Bindings;
use crate::schema::fields::{FieldSet, TavernField};
use crate::schema::record::{Concealed, Record};
use crate::schema::tables::{TavernNameTemplates, TavernTable};
use crate::store::handoff::PendingRequest;

pub const DESCRIPTION_FALLBACK: &str = "A non-descript drinking hole.";
pub const NO_PATRONS: &str = "Generate a tavern with patrons first!";
pub const DRINK_FALLBACK: &str = "Watered-down ale.";
pub const PATRON_COUNT: usize = 3;
pub const INNKEEPER_JOB: &str = "Innkeeper";

const INNKEEPER_TEMPLATE: &str = "The innkeeper is {personality} and {quirk}.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TavernFilters {
    #[serde(default)]
    pub tavern_type: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

impl TavernFilters {
    pub fn new(tavern_type: Option<&str>, quality: Option<&str>) -> Self {
        Self {
            tavern_type: tavern_type.map(str::to_string),
            quality: quality.map(str::to_string),
        }
    }
}

/// Categories used for a tavern, plus the innkeeper and patron lines kept
/// for promotion to NPCs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TavernResolved {
    pub tavern_type: String,
    pub quality: String,
    pub innkeeper: String,
    pub patrons: Vec<String>,
}

pub struct TavernAssembler {
    table: TavernTable,
    session: Session,
}

impl TavernAssembler {
    pub fn new(table: TavernTable, session: Session) -> Self {
        Self { table, session }
    }

    pub fn table(&self) -> &TavernTable {
        &self.table
    }

    fn try_assemble(
        &mut self,
        filters: &TavernFilters,
        force: bool,
        locks: &Locks<TavernField>,
    ) -> Option<Assembled<TavernField, TavernResolved>> {
        let Self { table, session } = self;

        let tavern_type =
            resolve_category(session, filters.tavern_type.as_deref(), force, &table.types)?;
        let quality =
            resolve_category(session, filters.quality.as_deref(), force, &table.qualities)?;

        let Some(by_quality) = table.descriptions.get(&tavern_type) else {
            debug!("no descriptions for tavern type {}", tavern_type);
            return None;
        };

        let name = locks.resolve(TavernField::Name, || {
            generate_name(session, &table.name_templates)
        });
        let description = locks.resolve(TavernField::Description, || {
            by_quality
                .get(&quality)
                .and_then(|d| session.pick(d))
                .cloned()
                .unwrap_or_else(|| DESCRIPTION_FALLBACK.to_string())
        });
        let signature_drink = locks.resolve(TavernField::SignatureDrink, || {
            table
                .signature_drinks
                .get(&quality)
                .and_then(|d| session.pick(d))
                .cloned()
                .unwrap_or_else(|| DRINK_FALLBACK.to_string())
        });

        let innkeeper = session.compose(
            INNKEEPER_TEMPLATE,
            &Bindings::new()
                .draw_unique(
                    "personality",
                    &table.innkeepers.personalities,
                    "innkeeperPersonalities",
                )
                .draw_unique("quirk", &table.innkeepers.quirks, "innkeeperQuirks"),
        );

        let eligible: Vec<&String> = table
            .patrons
            .iter()
            .filter(|p| !session.guard().is_recent("patrons", p))
            .collect();
        let pool: Vec<&String> = if eligible.is_empty() {
            table.patrons.iter().collect()
        } else {
            eligible
        };
        let patrons: Vec<String> = session
            .sample(&pool, PATRON_COUNT)
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        for patron in &patrons {
            session.guard_mut().record("patrons", patron);
        }

        let rumor = session.pick_unique(&table.rumors, "rumors");

        let record = Record::new(
            [
                (TavernField::Name, name),
                (TavernField::Subtitle, format!("{} {}", quality, tavern_type)),
                (TavernField::Description, description),
                (TavernField::Innkeeper, innkeeper.clone()),
                (TavernField::SignatureDrink, signature_drink),
                (TavernField::Patrons, patrons.join(" ")),
            ],
            Concealed::new(rumor),
        );

        Some(Assembled {
            record,
            resolved: TavernResolved {
                tavern_type,
                quality,
                innkeeper,
                patrons,
            },
        })
    }
}

fn generate_name(session: &mut Session, names: &TavernNameTemplates) -> String {
    let Some(template) = session.pick(&names.patterns).cloned() else {
        return String::new();
    };
    let noun = session.pick(&names.nouns).cloned();
    let second: Vec<String> = names
        .noun2
        .iter()
        .filter(|n| Some(*n) != noun.as_ref())
        .cloned()
        .collect();

    let mut bindings = Bindings::new()
        .draw("noun2", &second)
        .draw("adjective", &names.adjectives)
        .draw("ownerName", &names.owner_names)
        .draw("establishment", &names.establishments);
    if let Some(noun) = noun {
        bindings = bindings.literal("noun", noun);
    }
    session.compose(&template, &bindings)
}

impl Assembler for TavernAssembler {
    type Field = TavernField;
    type Filters = TavernFilters;
    type Resolved = TavernResolved;

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn assemble(
        &mut self,
        filters: &TavernFilters,
        force: bool,
        locks: &Locks<TavernField>,
    ) -> Result<Assembled<TavernField, TavernResolved>, AssembleError> {
        let max_attempts = self.session.config().max_attempts;
        with_retries(TavernField::KIND, max_attempts, force, |forced| {
            self.try_assemble(filters, forced, locks)
        })
    }

    fn reflect(resolved: &TavernResolved) -> TavernFilters {
        TavernFilters::new(Some(&resolved.tavern_type), Some(&resolved.quality))
    }
}

/// Queue the innkeeper as one NPC with the innkeeper job.
pub fn promote_innkeeper(resolved: &TavernResolved) -> PendingRequest {
    PendingRequest {
        quantity: 1,
        race: String::new(),
        job: INNKEEPER_JOB.to_string(),
        appearance: resolved.innkeeper.clone(),
    }
}

/// Best-effort race and job guesses for patron descriptions.
///
/// Races match as lowercase substrings with `_` read as a space; jobs match
/// as whole words. Longer names are tried first so "half elf" beats "elf".
#[derive(Debug, Clone)]
pub struct PatronMatcher {
    races: Vec<(String, String)>,
    jobs: Vec<(String, Regex)>,
}

impl PatronMatcher {
    pub fn new(races: &[String], jobs: &[String]) -> Result<Self, regex::Error> {
        let mut races: Vec<(String, String)> = races
            .iter()
            .map(|r| (r.clone(), r.replace('_', " ").to_lowercase()))
            .collect();
        races.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let mut sorted_jobs: Vec<&String> = jobs.iter().collect();
        sorted_jobs.sort_by(|a, b| b.len().cmp(&a.len()));
        let jobs = sorted_jobs
            .into_iter()
            .map(|job| {
                let pattern = format!(r"\b{}\b", regex::escape(&job.to_lowercase()));
                Regex::new(&pattern).map(|re| (job.clone(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { races, jobs })
    }

    pub fn request_for(&self, patron: &str) -> PendingRequest {
        let lower = patron.to_lowercase();
        let race = self
            .races
            .iter()
            .find(|(_, needle)| lower.contains(needle.as_str()))
            .map(|(race, _)| race.clone())
            .unwrap_or_default();
        let job = self
            .jobs
            .iter()
            .find(|(_, re)| re.is_match(&lower))
            .map(|(job, _)| job.clone())
            .unwrap_or_default();
        PendingRequest {
            quantity: 1,
            race,
            job,
            appearance: patron.to_string(),
        }
    }

    /// One request per patron, in order. `None` when the tavern has no
    /// patrons to promote.
    pub fn promote_patrons(&self, resolved: &TavernResolved) -> Option<Vec<PendingRequest>> {
        if resolved.patrons.is_empty() {
            return None;
        }
        Some(resolved.patrons.iter().map(|p| self.request_for(p)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::FragmentTable;

    const TABLE: &str = r#"(
        types: ["Inn", "Dive"],
        qualities: ["Poor", "Fine"],
        nameTemplates: (
            patterns: ["The {noun} and {noun2}"],
            nouns: ["Stag", "Crow"],
            noun2: ["Stag", "Crow"],
        ),
        descriptions: {
            "Inn": {"Poor": ["Drafty and damp."]},
        },
        innkeepers: (personalities: ["cheerful"], quirks: ["never blinks"]),
        signature_drinks: {"Poor": ["Swamp Grog"]},
        patrons: ["A dwarf miner.", "An elf bard.", "A half elf guard.", "A sailor.", "A nun."],
        rumors: ["The well is haunted."],
    )"#;

    fn assembler(seed: u64) -> TavernAssembler {
        TavernAssembler::new(TavernTable::parse_ron(TABLE).unwrap(), Session::seeded(seed))
    }

    #[test]
    fn builds_fields_with_fallbacks() {
        let mut a = assembler(1);
        let filters = TavernFilters::new(Some("Inn"), Some("Fine"));
        let out = a.assemble(&filters, false, &Locks::new()).unwrap();
        let r = &out.record;
        assert_eq!(r.get(TavernField::Subtitle), "Fine Inn");
        assert_eq!(r.get(TavernField::Description), DESCRIPTION_FALLBACK);
        assert_eq!(r.get(TavernField::SignatureDrink), DRINK_FALLBACK);
        assert_eq!(
            r.get(TavernField::Innkeeper),
            "The innkeeper is cheerful and never blinks."
        );
        assert_eq!(out.resolved.patrons.len(), PATRON_COUNT);
        assert_eq!(r.get(TavernField::Patrons), out.resolved.patrons.join(" "));
        assert_eq!(r.concealed().value(), "The well is haunted.");
    }

    #[test]
    fn second_noun_differs_from_first() {
        let mut a = assembler(2);
        let filters = TavernFilters::new(Some("Inn"), Some("Poor"));
        for _ in 0..30 {
            let out = a.assemble(&filters, false, &Locks::new()).unwrap();
            let name = out.record.name();
            assert!(name == "The Stag and Crow" || name == "The Crow and Stag", "{name}");
        }
    }

    #[test]
    fn patrons_avoid_the_recent_window() {
        let mut a = assembler(3);
        let filters = TavernFilters::new(Some("Inn"), Some("Poor"));
        let first = a.assemble(&filters, false, &Locks::new()).unwrap();
        let second = a.assemble(&filters, false, &Locks::new()).unwrap();
        // Five patrons, three recent: the next tavern gets the other two.
        assert_eq!(second.resolved.patrons.len(), 2);
        for patron in &second.resolved.patrons {
            assert!(!first.resolved.patrons.contains(patron));
        }
    }

    #[test]
    fn unknown_type_retries_into_known_one() {
        let mut a = assembler(4);
        let config = crate::core::session::ForgeConfig {
            max_attempts: 40,
            ..Default::default()
        };
        *a.session_mut() = Session::seeded(4).with_config(config);
        let out = a
            .assemble(&TavernFilters::new(Some("Dive"), None), false, &Locks::new())
            .unwrap();
        assert_eq!(out.resolved.tavern_type, "Inn");
    }

    #[test]
    fn innkeeper_promotion() {
        let resolved = TavernResolved {
            tavern_type: "Inn".into(),
            quality: "Poor".into(),
            innkeeper: "The innkeeper is dour and hums.".into(),
            patrons: vec![],
        };
        let request = promote_innkeeper(&resolved);
        assert_eq!(request.job, "Innkeeper");
        assert_eq!(request.race, "");
        assert_eq!(request.appearance, "The innkeeper is dour and hums.");

        let matcher = PatronMatcher::new(&["elf".to_string()], &["Bard".to_string()]).unwrap();
        assert_eq!(matcher.promote_patrons(&resolved), None);
    }

    #[test]
    fn patron_matching_prefers_longest_names() {
        let races: Vec<String> = ["elf", "half_elf", "dwarf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let jobs: Vec<String> = ["Guard", "Guard Captain", "Bard"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let matcher = PatronMatcher::new(&races, &jobs).unwrap();

        let captain = matcher.request_for("A weary half elf guard captain nursing ale.");
        assert_eq!(captain.race, "half_elf");
        assert_eq!(captain.job, "Guard Captain");

        let bard = matcher.request_for("An Elf bard tuning a lute.");
        assert_eq!(bard.race, "elf");
        assert_eq!(bard.job, "Bard");

        let nobody = matcher.request_for("A bodyguard with a dwarf-sized axe.");
        assert_eq!(nobody.race, "dwarf");
        assert_eq!(nobody.job, "");
        assert_eq!(nobody.quantity, 1);
    }
}
