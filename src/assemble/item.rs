/// Magic item assembler.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::assembler::{
    resolve_category, with_retries, AssembleError, Assembled, Assembler, Locks,
};
use crate::core::session::Session;
use crate::core::template::Bindings;
use crate::schema::fields::{FieldSet, ItemField};
use crate::schema::record::{Concealed, Record};
use crate::schema::tables::{ItemTable, ItemTypeData, Power};

/// Curse value when the item is not cursed.
pub const CURSE_NONE: &str = "None.";
pub const UNNAMED_ITEM: &str = "Unnamed Item";

const DESCRIPTION_TEMPLATE: &str = "A {subtype} made of {material} that {visual}.";
const HISTORY_TEMPLATE: &str = "This item was created by {creator} and was once {history}.";

/// Probability that an item of `tier` carries a curse. Unknown tiers are
/// never cursed.
pub fn curse_chance(tier: &str) -> f64 {
    match tier {
        "Common" => 0.0,
        "Uncommon" => 0.1,
        "Rare" => 0.25,
        "Very Rare" => 0.4,
        "Legendary" => 0.5,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilters {
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub power_level: Option<String>,
}

impl ItemFilters {
    pub fn new(item_type: Option<&str>, power_level: Option<&str>) -> Self {
        Self {
            item_type: item_type.map(str::to_string),
            power_level: power_level.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResolved {
    pub item_type: String,
    pub power_level: String,
    pub power: Power,
}

pub struct ItemAssembler {
    table: ItemTable,
    session: Session,
}

impl ItemAssembler {
    pub fn new(table: ItemTable, session: Session) -> Self {
        Self { table, session }
    }

    pub fn table(&self) -> &ItemTable {
        &self.table
    }

    fn try_assemble(
        &mut self,
        filters: &ItemFilters,
        force: bool,
        locks: &Locks<ItemField>,
    ) -> Option<Assembled<ItemField, ItemResolved>> {
        let Self { table, session } = self;

        let item_type =
            resolve_category(session, filters.item_type.as_deref(), force, &table.types)?;
        let tier =
            resolve_category(session, filters.power_level.as_deref(), force, &table.power_levels)?;

        let Some(powers) = table.powers(&item_type, &tier) else {
            debug!("no power data for {} at {}", item_type, tier);
            return None;
        };
        let power = session.pick(powers)?.clone();
        let info = table.item_data.get(&item_type);

        let name = locks.resolve(ItemField::Name, || generate_name(session, info, &power));
        let description = locks.resolve(ItemField::Description, || match info {
            Some(info) => session.compose(
                DESCRIPTION_TEMPLATE,
                &Bindings::new()
                    .draw("subtype", &info.subtypes)
                    .draw("material", &info.materials)
                    .draw("visual", &info.visuals),
            ),
            None => session.compose(DESCRIPTION_TEMPLATE, &Bindings::new()),
        });
        let history = locks.resolve(ItemField::History, || {
            session.compose(
                HISTORY_TEMPLATE,
                &Bindings::new()
                    .draw("creator", &table.creators)
                    .draw("history", &table.histories),
            )
        });

        let curse = if !table.curses.is_empty() && session.chance(curse_chance(&tier)) {
            session.pick_unique(&table.curses, "curses")
        } else {
            CURSE_NONE.to_string()
        };

        let record = Record::new(
            [
                (ItemField::Name, name),
                (ItemField::Subtitle, format!("{} {}", tier, item_type)),
                (ItemField::Description, description),
                (ItemField::Powers, power.description.clone()),
                (ItemField::History, history),
            ],
            Concealed::new(curse),
        );

        Some(Assembled {
            record,
            resolved: ItemResolved {
                item_type,
                power_level: tier,
                power,
            },
        })
    }
}

fn generate_name(session: &mut Session, info: Option<&ItemTypeData>, power: &Power) -> String {
    let Some(info) = info else {
        return UNNAMED_ITEM.to_string();
    };
    let Some(template) = session.pick(&info.name_templates) else {
        return UNNAMED_ITEM.to_string();
    };
    let bindings = Bindings::new()
        .draw("subtype", &info.subtypes)
        .draw("adjective", &info.adjectives)
        .literal("effectWord", power.name.clone())
        .draw("creatorName", &info.creator_names);
    session.compose(template, &bindings)
}

impl Assembler for ItemAssembler {
    type Field = ItemField;
    type Filters = ItemFilters;
    type Resolved = ItemResolved;

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn assemble(
        &mut self,
        filters: &ItemFilters,
        force: bool,
        locks: &Locks<ItemField>,
    ) -> Result<Assembled<ItemField, ItemResolved>, AssembleError> {
        let max_attempts = self.session.config().max_attempts;
        with_retries(ItemField::KIND, max_attempts, force, |forced| {
            self.try_assemble(filters, forced, locks)
        })
    }

    fn reflect(resolved: &ItemResolved) -> ItemFilters {
        ItemFilters::new(Some(&resolved.item_type), Some(&resolved.power_level))
    }
}
