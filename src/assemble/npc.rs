/// NPC assembler.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::assemble::capitalize;
use crate::core::assembler::{
    resolve_category, with_retries, AssembleError, Assembled, Assembler, Locks,
};
use crate::core::session::Session;
use crate::core::template::Bindings;
use crate::schema::fields::{FieldSet, NpcField};
use crate::schema::record::{Concealed, Record};
use crate::schema::tables::{NpcTable, RaceData};
use crate::store::handoff::{total_quantity, PendingRequest};

pub const GENDERS: [&str; 3] = ["male", "female", "neutral"];
pub const DEFAULT_PLACE: &str = "the area";
pub const NAMELESS: &str = "Nameless";
/// Most NPCs one batch of queued requests may produce.
pub const MAX_QUEUED_NPCS: u32 = 50;

/// Races whose female and neutral characters never get beard traits.
const BEARDLESS_RACES: [&str; 3] = ["human", "elf", "halfling"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcFilters {
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
    /// Bound to `{place}` in hooks, goals, offers and secrets.
    #[serde(default)]
    pub place: Option<String>,
}

impl NpcFilters {
    /// Filters for a queued request. Empty hints are left for the picker.
    pub fn from_request(request: &PendingRequest) -> Self {
        let hint = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            race: hint(&request.race),
            job: hint(&request.job),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcResolved {
    pub race: String,
    pub gender: String,
    pub job: String,
}

pub struct NpcAssembler {
    table: NpcTable,
    session: Session,
}

impl NpcAssembler {
    pub fn new(table: NpcTable, session: Session) -> Self {
        Self { table, session }
    }

    pub fn table(&self) -> &NpcTable {
        &self.table
    }

    /// Assemble every NPC a list of queued requests asks for, in order,
    /// stopping at `MAX_QUEUED_NPCS`.
    pub fn assemble_requests(
        &mut self,
        requests: &[PendingRequest],
    ) -> Result<Vec<Assembled<NpcField, NpcResolved>>, AssembleError> {
        let requested = total_quantity(requests);
        if requested > MAX_QUEUED_NPCS {
            warn!(
                "{} NPCs queued, generating the first {}",
                requested, MAX_QUEUED_NPCS
            );
        }
        let mut remaining = requested.min(MAX_QUEUED_NPCS);
        let mut out = Vec::with_capacity(remaining as usize);
        for request in requests {
            let filters = NpcFilters::from_request(request);
            let count = request.quantity.min(remaining);
            for _ in 0..count {
                out.push(self.assemble(&filters, false, &Locks::new())?);
            }
            remaining -= count;
        }
        Ok(out)
    }

    fn try_assemble(
        &mut self,
        filters: &NpcFilters,
        force: bool,
        locks: &Locks<NpcField>,
    ) -> Option<Assembled<NpcField, NpcResolved>> {
        let Self { table, session } = self;

        let race = resolve_category(session, filters.race.as_deref(), force, &table.races)?;
        let gender = resolve_category(session, filters.gender.as_deref(), force, &GENDERS)?;
        let job = resolve_category(session, filters.job.as_deref(), force, &table.jobs)?;

        let Some(race_data) = table.race(&race) else {
            debug!("no usable race data for {}", race);
            return None;
        };

        let name = locks.resolve(NpcField::Name, || generate_name(session, race_data, &gender));
        let appearance = locks.resolve(NpcField::Appearance, || {
            generate_appearance(session, race_data, &race, &gender)
        });
        let details = locks.resolve(NpcField::Details, || {
            session.compose(
                "{personality}; {quirk}.",
                &Bindings::new()
                    .draw_unique("personality", &table.personalities, "personalities")
                    .draw_unique("quirk", &table.quirks, "quirks"),
            )
        });

        let place = filters
            .place
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PLACE);
        let mut flavor = |pool: &[String], category: &str| {
            let raw = session.pick_unique(pool, category);
            session.compose(&raw, &Bindings::new().literal("place", place))
        };
        let hook = flavor(table.hooks_for(&job), "hooks");
        let goal = flavor(table.goals_for(&job), "goals");
        let offer = flavor(table.offers_for(&job), "offers");
        let secret = flavor(&table.secrets, "secrets");

        let voice_mannerism = session.compose(
            "{voice}; {mannerism}.",
            &Bindings::new()
                .draw_unique("voice", &table.voices, "voices")
                .draw_unique("mannerism", &table.mannerisms, "mannerisms"),
        );

        let record = Record::new(
            [
                (NpcField::Name, name),
                (
                    NpcField::Subtitle,
                    format!("{} {} ({})", capitalize(&race), job, gender),
                ),
                (NpcField::Appearance, appearance),
                (NpcField::Details, details),
                (NpcField::VoiceMannerism, voice_mannerism),
                (NpcField::Hook, hook),
                (NpcField::GoalOffer, format!("{} They can offer: {}.", goal, offer)),
            ],
            Concealed::new(secret),
        );

        Some(Assembled {
            record,
            resolved: NpcResolved { race, gender, job },
        })
    }
}

fn generate_name(session: &mut Session, race: &RaceData, gender: &str) -> String {
    let listed = race.names.get(gender).and_then(|names| session.pick(names));
    let first = match listed {
        Some(first) => first.clone(),
        None => match &race.name_syllables {
            Some(syllables) if !syllables.patterns.is_empty() => {
                let pattern = session.pick(&syllables.patterns).cloned().unwrap_or_default();
                let mut built = String::new();
                for (letter, pool) in [
                    ('P', &syllables.prefix),
                    ('M', &syllables.middle),
                    ('S', &syllables.suffix),
                ] {
                    if pattern.contains(letter) {
                        if let Some(part) = session.pick(pool) {
                            built.push_str(part);
                        }
                    }
                }
                capitalize(&built)
            }
            _ => NAMELESS.to_string(),
        },
    };
    match session.pick(&race.last_names) {
        Some(last) => format!("{} {}", first, last),
        None => first,
    }
}

fn generate_appearance(session: &mut Session, data: &RaceData, race: &str, gender: &str) -> String {
    let mut physical: Vec<&String> = data.appearance.shared.physical.iter().collect();
    let mut clothing: Vec<&String> = data.appearance.shared.clothing.iter().collect();
    if let Some(extra) = data.appearance.gender.get(gender) {
        physical.extend(&extra.physical);
        clothing.extend(&extra.clothing);
    }
    if matches!(gender, "female" | "neutral") && BEARDLESS_RACES.contains(&race) {
        physical.retain(|t| !t.to_lowercase().contains("beard"));
    }

    let physical_count = session.between(2, 3);
    let clothing_count = session.between(1, 2);
    let mut traits: Vec<&str> = session
        .sample(&physical, physical_count)
        .into_iter()
        .map(|t| t.as_str())
        .collect();
    traits.extend(
        session
            .sample(&clothing, clothing_count)
            .into_iter()
            .map(|t| t.as_str()),
    );
    traits.join("; ")
}

impl Assembler for NpcAssembler {
    type Field = NpcField;
    type Filters = NpcFilters;
    type Resolved = NpcResolved;

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn assemble(
        &mut self,
        filters: &NpcFilters,
        force: bool,
        locks: &Locks<NpcField>,
    ) -> Result<Assembled<NpcField, NpcResolved>, AssembleError> {
        let max_attempts = self.session.config().max_attempts;
        with_retries(NpcField::KIND, max_attempts, force, |forced| {
            self.try_assemble(filters, forced, locks)
        })
    }

    fn reflect(resolved: &NpcResolved) -> NpcFilters {
        NpcFilters {
            race: Some(resolved.race.clone()),
            gender: Some(resolved.gender.clone()),
            job: Some(resolved.job.clone()),
            place: None,
        }
    }
}
