/// Shipped fragment table tests: every table loads and covers the
/// category combinations the generators pick from.

use instantforge::core::template::Template;
use instantforge::{FragmentTable, ItemTable, NpcTable, TavernTable};
use std::path::Path;

fn items() -> ItemTable {
    ItemTable::load_from_ron(Path::new("forge_data/magic_items.ron")).unwrap()
}

fn npcs() -> NpcTable {
    NpcTable::load_from_ron(Path::new("forge_data/npcs.ron")).unwrap()
}

fn taverns() -> TavernTable {
    TavernTable::load_from_ron(Path::new("forge_data/taverns.ron")).unwrap()
}

#[test]
fn every_item_type_has_powers_at_every_tier() {
    let table = items();
    assert_eq!(table.power_levels.len(), 5);
    assert!(table.missing_combinations().is_empty());
    for item_type in &table.types {
        assert!(table.item_data.contains_key(item_type), "{item_type} has no data");
    }
}

#[test]
fn item_name_templates_use_known_placeholders() {
    let known = ["subtype", "adjective", "effectWord", "creatorName"];
    for data in items().item_data.values() {
        for raw in &data.name_templates {
            for token in Template::parse(raw).placeholders() {
                assert!(known.contains(&token), "unknown placeholder {token} in {raw}");
            }
        }
    }
}

#[test]
fn every_npc_race_is_usable() {
    let table = npcs();
    assert!(table.missing_races().is_empty());
    for race in &table.races {
        let data = table.race(race).unwrap();
        let has_names = ["male", "female", "neutral"]
            .iter()
            .all(|g| data.names.get(*g).is_some_and(|n| !n.is_empty()));
        assert!(
            has_names || data.name_syllables.is_some(),
            "{race} cannot produce a first name for every gender"
        );
    }
}

#[test]
fn npc_flavor_pools_fall_back_to_global() {
    let table = npcs();
    for job in &table.jobs {
        assert!(!table.hooks_for(job).is_empty(), "{job} has no hooks");
        assert!(!table.goals_for(job).is_empty(), "{job} has no goals");
        assert!(!table.offers_for(job).is_empty(), "{job} has no offers");
    }
    assert!(table.jobs.iter().any(|j| j == "Innkeeper"));
}

#[test]
fn tavern_descriptions_cover_all_but_one_pair() {
    let table = taverns();
    assert_eq!(
        table.missing_descriptions(),
        vec![("Dockside Dive".to_string(), "Wealthy".to_string())]
    );
    assert!(table.undescribed_types().is_empty());
    for quality in &table.qualities {
        assert!(table.signature_drinks.contains_key(quality));
    }
}

#[test]
fn shipped_pools_exceed_the_recency_window() {
    let window = instantforge::core::recency::DEFAULT_WINDOW;
    assert!(taverns().rumors.len() > window);
    assert!(npcs().secrets.len() > window);
}
