/// Generation integration tests: workbenches over the shipped tables,
/// from assembly through save, export and the tavern-to-NPC handoff.

use instantforge::assemble::item::CURSE_NONE;
use instantforge::assemble::tavern::{promote_innkeeper, PatronMatcher, INNKEEPER_JOB};
use instantforge::assemble::{
    ItemAssembler, ItemFilters, NpcAssembler, NpcFilters, TavernAssembler, TavernFilters,
};
use instantforge::export::{self, ExportFormat};
use instantforge::store::{HandoffQueue, KeyValueStore, MemoryStore};
use instantforge::{
    AssetKind, FieldSet, FragmentTable, ItemField, ItemTable, NpcField, NpcTable, Session,
    TavernField, TavernTable, Workbench, WorkbenchError,
};
use std::collections::HashSet;
use std::path::Path;

fn item_bench(seed: u64) -> Workbench<ItemAssembler, MemoryStore> {
    let table = ItemTable::load_from_ron(Path::new("forge_data/magic_items.ron")).unwrap();
    Workbench::new(ItemAssembler::new(table, Session::seeded(seed)), MemoryStore::new())
}

fn npc_assembler(seed: u64) -> NpcAssembler {
    let table = NpcTable::load_from_ron(Path::new("forge_data/npcs.ron")).unwrap();
    NpcAssembler::new(table, Session::seeded(seed))
}

fn tavern_bench(seed: u64) -> Workbench<TavernAssembler, MemoryStore> {
    let table = TavernTable::load_from_ron(Path::new("forge_data/taverns.ron")).unwrap();
    Workbench::new(TavernAssembler::new(table, Session::seeded(seed)), MemoryStore::new())
}

#[test]
fn locked_fields_survive_regeneration() {
    let mut bench = item_bench(7);
    bench.generate(false).unwrap();
    let name = bench.record().unwrap().get(ItemField::Name).to_string();
    assert!(bench.toggle_lock(ItemField::Name).unwrap());
    bench.lock_with(ItemField::History, "Forged in a dream.").unwrap();

    for _ in 0..20 {
        let out = bench.generate(true).unwrap();
        assert_eq!(out.record.get(ItemField::Name), name);
        assert_eq!(out.record.get(ItemField::History), "Forged in a dream.");
    }

    assert!(!bench.toggle_lock(ItemField::Name).unwrap());
    assert!(bench.lock_with(ItemField::Powers, "Flight").is_err());
}

#[test]
fn filters_follow_the_last_resolved_categories() {
    let mut bench = item_bench(3);
    bench.set_filters(ItemFilters::new(Some("Wand"), Some("Rare")));
    let out = bench.generate(false).unwrap();
    assert_eq!(out.record.get(ItemField::Subtitle), "Rare Wand");
    assert_eq!(bench.filters(), &ItemFilters::new(Some("Wand"), Some("Rare")));

    bench.generate(true).unwrap();
    let resolved = &bench.current().unwrap().resolved;
    assert_eq!(
        bench.filters(),
        &ItemFilters::new(Some(resolved.item_type.as_str()), Some(resolved.power_level.as_str()))
    );
}

#[test]
fn common_items_are_never_cursed() {
    let mut bench = item_bench(11);
    bench.set_filters(ItemFilters::new(None, Some("Common")));
    for _ in 0..300 {
        let out = bench.generate(false).unwrap();
        assert_eq!(out.record.concealed().value(), CURSE_NONE);
    }
}

#[test]
fn legendary_items_are_cursed_about_half_the_time() {
    let mut bench = item_bench(2024);
    bench.set_filters(ItemFilters::new(None, Some("Legendary")));
    let runs = 1000;
    let cursed = (0..runs)
        .filter(|_| bench.generate(false).unwrap().record.concealed().value() != CURSE_NONE)
        .count();
    let rate = cursed as f64 / runs as f64;
    assert!((0.42..=0.58).contains(&rate), "legendary curse rate {rate}");
}

#[test]
fn concealed_value_stays_out_of_visible_fields() {
    let mut bench = tavern_bench(5);
    for _ in 0..50 {
        let out = bench.generate(true).unwrap();
        let rumor = out.record.concealed().value().to_string();
        assert_eq!(out.record.concealed().display(), "(Click to reveal)");
        for (_, value) in out.record.visible() {
            assert!(!value.contains(&rumor));
        }
    }
    let rumor = bench.reveal().unwrap();
    assert_eq!(bench.record().unwrap().concealed().display(), rumor);
}

#[test]
fn rumors_do_not_repeat_within_the_window() {
    let mut bench = tavern_bench(9);
    let rumors: Vec<String> = (0..12)
        .map(|_| bench.generate(true).unwrap().record.concealed().value().to_string())
        .collect();
    let first_eleven: HashSet<&String> = rumors[..11].iter().collect();
    assert_eq!(first_eleven.len(), 11);
    // Eleven rumors, window of ten: only the oldest is eligible again.
    assert_eq!(rumors[11], rumors[0]);
}

#[test]
fn nothing_generated_blocks_record_actions() {
    let mut bench = tavern_bench(1);
    for err in [
        bench.save_current().unwrap_err(),
        bench.copy_text().unwrap_err(),
        bench.reveal().unwrap_err(),
    ] {
        assert!(matches!(err, WorkbenchError::NothingGenerated(AssetKind::Tavern)));
        assert_eq!(err.to_string(), "Generate a tavern first!");
    }
}

#[test]
fn saved_history_exports_and_round_trips() {
    let mut bench = item_bench(42);
    assert!(bench.export(ExportFormat::Csv).is_err());

    let mut ids = Vec::new();
    for _ in 0..3 {
        bench.generate(true).unwrap();
        ids.push(bench.save_current().unwrap());
    }
    assert_eq!(bench.history().len(), 3);
    assert_eq!(bench.history().entries()[0].id, ids[2]);

    let doc = bench.export(ExportFormat::Json).unwrap();
    assert_eq!(doc.file_name, "instantforge_item_history.json");
    let parsed = export::from_json(&doc.content).unwrap();
    assert_eq!(parsed, bench.history().entries());
    assert!(parsed.iter().all(|e| !e.field("curse").is_empty()));

    let csv = bench.export(ExportFormat::Csv).unwrap();
    assert_eq!(csv.content.lines().count(), 4);
    let print = bench.export(ExportFormat::Print).unwrap();
    assert_eq!(print.content.matches("entry-page item-page").count(), 3);
}

#[test]
fn delete_keeps_other_entries_in_order() {
    let mut bench = tavern_bench(8);
    let mut ids = Vec::new();
    for _ in 0..3 {
        bench.generate(true).unwrap();
        ids.push(bench.save_current().unwrap());
    }
    assert!(bench.delete_saved(ids[1]).unwrap());
    let remaining: Vec<u64> = bench.history().entries().iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec![ids[2], ids[0]]);
    assert!(!bench.delete_saved(ids[1]).unwrap());
}

#[test]
fn clearing_history_requires_confirmation() {
    let mut bench = item_bench(4);
    assert_eq!(bench.clear_history(false).unwrap(), 0);

    bench.generate(false).unwrap();
    bench.save_current().unwrap();
    assert!(matches!(
        bench.clear_history(false),
        Err(WorkbenchError::ConfirmationRequired)
    ));
    assert_eq!(bench.history().len(), 1);
    assert_eq!(bench.clear_history(true).unwrap(), 1);
    assert!(bench.history().is_empty());
}

#[test]
fn history_survives_a_new_workbench_on_the_same_store() {
    let mut bench = item_bench(6);
    bench.generate(false).unwrap();
    let id = bench.save_current().unwrap();
    let store = bench.store().clone();

    let table = ItemTable::load_from_ron(Path::new("forge_data/magic_items.ron")).unwrap();
    let reopened = Workbench::new(ItemAssembler::new(table, Session::seeded(6)), store);
    assert_eq!(reopened.history().len(), 1);
    assert!(reopened.history().get(id).is_some());
}

#[test]
fn unreadable_history_is_never_overwritten_by_a_save() {
    let table = ItemTable::load_from_ron(Path::new("forge_data/magic_items.ron")).unwrap();
    let store = MemoryStore::new().with_value("savedMagicItems", "[{\"id\": 1, \"name\": ");
    let mut bench = Workbench::new(ItemAssembler::new(table, Session::seeded(13)), store);
    assert!(bench.history().is_empty());

    bench.generate(false).unwrap();
    assert!(bench.save_current().is_err());
    assert_eq!(
        bench.store().get("savedMagicItems").unwrap().as_deref(),
        Some("[{\"id\": 1, \"name\": ")
    );

    assert!(matches!(
        bench.clear_history(false),
        Err(WorkbenchError::ConfirmationRequired)
    ));
    assert_eq!(bench.clear_history(true).unwrap(), 0);
    bench.save_current().unwrap();
    assert_eq!(bench.history().len(), 1);
}

#[test]
fn innkeeper_promotion_reaches_the_npc_generator() {
    let mut taverns = tavern_bench(12);
    taverns.set_filters(TavernFilters::new(Some("Inn"), Some("Modest")));
    taverns.generate(false).unwrap();
    let resolved = taverns.current().unwrap().resolved.clone();

    let mut queue = HandoffQueue::new(MemoryStore::new());
    assert_eq!(queue.append(&[promote_innkeeper(&resolved)]).unwrap(), 1);

    let npcs = NpcTable::load_from_ron(Path::new("forge_data/npcs.ron")).unwrap();
    let matcher = PatronMatcher::new(&npcs.races, &npcs.jobs).unwrap();
    let patrons = matcher.promote_patrons(&resolved).unwrap();
    assert_eq!(patrons.len(), resolved.patrons.len());
    let total = queue.append(&patrons).unwrap();
    assert_eq!(total, 1 + patrons.len() as u32);

    let requests = queue.pending();
    let mut assembler = npc_assembler(12);
    let generated = queue
        .consume(|pending| {
            assembler
                .assemble_requests(pending)
                .map_err(WorkbenchError::from)
        })
        .unwrap();
    assert!(queue.pending().is_empty());
    assert_eq!(generated.len(), total as usize);
    assert_eq!(generated[0].resolved.job, INNKEEPER_JOB);
    assert!(generated[0]
        .record
        .get(NpcField::Subtitle)
        .contains(INNKEEPER_JOB));
    for (npc, request) in generated[1..].iter().zip(&requests[1..]) {
        if !request.job.is_empty() {
            assert_eq!(npc.resolved.job, request.job);
        }
        if !request.race.is_empty() {
            assert_eq!(npc.resolved.race, request.race);
        }
    }
}

#[test]
fn npc_filters_pin_race_and_job() {
    let mut bench = Workbench::new(npc_assembler(21), MemoryStore::new());
    bench.set_filters(NpcFilters {
        race: Some("dwarf".into()),
        gender: Some("female".into()),
        job: Some("Blacksmith".into()),
        place: Some("Millbrook".into()),
    });
    for _ in 0..10 {
        let out = bench.generate(false).unwrap();
        assert_eq!(out.record.get(NpcField::Subtitle), "Dwarf Blacksmith (female)");
        assert!(!out.record.get(NpcField::Name).is_empty());
        assert!(!out.record.get(NpcField::Hook).contains("{place}"));
    }
}

#[test]
fn copy_text_hides_the_concealed_value_until_revealed() {
    let mut bench = tavern_bench(30);
    bench.generate(false).unwrap();
    let text = bench.copy_text().unwrap();
    assert!(text.starts_with("Name: "));
    assert!(text.ends_with("Rumor: (hidden)"));
    let rumor = bench.reveal().unwrap();
    assert!(bench.copy_text().unwrap().ends_with(&format!("Rumor: {rumor}")));
    for field in TavernField::ALL.iter().filter(|f| f.lockable()) {
        assert!(bench.toggle_lock(*field).unwrap());
    }
}
