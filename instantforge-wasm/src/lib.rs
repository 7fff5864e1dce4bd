//! WASM bindings for instantforge, backing the three generator pages.
//!
//! Every method takes and returns JSON strings. Saved history lives in
//! `localStorage`; the tavern-to-NPC handoff queue lives in `sessionStorage`.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use instantforge::assemble::tavern::{promote_innkeeper, PatronMatcher, NO_PATRONS};
use instantforge::assemble::{ItemAssembler, NpcAssembler, TavernAssembler};
use instantforge::assemble::npc::GENDERS;
use instantforge::export::ExportFormat;
use instantforge::store::{HandoffQueue, KeyValueStore, StoreError};
use instantforge::{
    AssetKind, Assembled, Assembler, FieldSet, FragmentTable, ItemTable, Locks, NpcTable, Session,
    TavernTable, Workbench,
};

// ---------------------------------------------------------------------------
// Embedded fragment tables, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const MAGIC_ITEMS: &str = include_str!("../../forge_data/magic_items.ron");
    pub const NPCS: &str = include_str!("../../forge_data/npcs.ron");
    pub const TAVERNS: &str = include_str!("../../forge_data/taverns.ron");
}

// ---------------------------------------------------------------------------
// Browser storage
// ---------------------------------------------------------------------------
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = localStorage, js_name = getItem)]
    fn local_get(key: &str) -> Result<Option<String>, JsValue>;
    #[wasm_bindgen(catch, js_namespace = localStorage, js_name = setItem)]
    fn local_set(key: &str, value: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = localStorage, js_name = removeItem)]
    fn local_remove(key: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = sessionStorage, js_name = getItem)]
    fn session_get(key: &str) -> Result<Option<String>, JsValue>;
    #[wasm_bindgen(catch, js_namespace = sessionStorage, js_name = setItem)]
    fn session_set(key: &str, value: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(catch, js_namespace = sessionStorage, js_name = removeItem)]
    fn session_remove(key: &str) -> Result<(), JsValue>;
}

fn backend(e: JsValue) -> StoreError {
    StoreError::Backend(format!("{e:?}"))
}

/// Persistent per-origin storage for saved history.
pub struct LocalStorage;

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        local_get(key).map_err(backend)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        local_set(key, value).map_err(backend)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        local_remove(key).map_err(backend)
    }
}

/// Tab-scoped storage for the handoff queue.
pub struct SessionStorage;

impl KeyValueStore for SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        session_get(key).map_err(backend)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        session_set(key, value).map_err(backend)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        session_remove(key).map_err(backend)
    }
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldView {
    key: &'static str,
    label: &'static str,
    value: String,
    lockable: bool,
    locked: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConcealedView {
    key: &'static str,
    label: &'static str,
    display: String,
    revealed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordView {
    kind: AssetKind,
    fields: Vec<FieldView>,
    concealed: ConcealedView,
    resolved: serde_json::Value,
}

#[derive(Serialize)]
struct Promotion {
    added: usize,
    total: u32,
}

fn js(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn view_of<F: FieldSet, R: Serialize>(
    assembled: &Assembled<F, R>,
    locks: Option<&Locks<F>>,
) -> Result<RecordView, JsError> {
    let record = &assembled.record;
    let fields = record
        .visible()
        .map(|(field, value)| FieldView {
            key: field.key(),
            label: field.label(),
            value: value.to_string(),
            lockable: field.lockable(),
            locked: locks.is_some_and(|l| l.is_locked(field)),
        })
        .collect();
    let column = F::KIND.concealed();
    Ok(RecordView {
        kind: F::KIND,
        fields,
        concealed: ConcealedView {
            key: column.key,
            label: column.label,
            display: record.concealed().display().to_string(),
            revealed: record.concealed().is_revealed(),
        },
        resolved: serde_json::to_value(&assembled.resolved)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))?,
    })
}

fn current_view<A: Assembler, S: KeyValueStore>(
    bench: &Workbench<A, S>,
) -> Result<String, JsError> {
    let assembled = bench
        .current()
        .ok_or_else(|| js(instantforge::WorkbenchError::NothingGenerated(bench.kind())))?;
    to_json(&view_of(assembled, Some(bench.locks()))?)
}

fn field_of<F: FieldSet>(key: &str) -> Result<F, JsError> {
    F::from_key(key).ok_or_else(|| JsError::new(&format!("Unknown field: {key}")))
}

fn set_filters<A: Assembler, S: KeyValueStore>(
    bench: &mut Workbench<A, S>,
    json: &str,
) -> Result<(), JsError> {
    let filters: A::Filters = serde_json::from_str(json)
        .map_err(|e| JsError::new(&format!("Invalid filters JSON: {e}")))?;
    bench.set_filters(filters);
    Ok(())
}

enum Desk {
    Item(Workbench<ItemAssembler, LocalStorage>),
    Npc(Workbench<NpcAssembler, LocalStorage>),
    Tavern(Workbench<TavernAssembler, LocalStorage>),
}

/// Run the same body against whichever workbench the desk holds.
macro_rules! on_desk {
    ($desk:expr, $bench:ident => $body:expr) => {
        match $desk {
            Desk::Item($bench) => $body,
            Desk::Npc($bench) => $body,
            Desk::Tavern($bench) => $body,
        }
    };
}

fn session_for(seed: Option<u64>) -> Session {
    match seed {
        Some(seed) => Session::seeded(seed),
        None => Session::from_entropy(),
    }
}

// ---------------------------------------------------------------------------
// Forge: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct Forge {
    desk: Desk,
    handoff: HandoffQueue<SessionStorage>,
    patrons: Option<PatronMatcher>,
}

#[wasm_bindgen]
impl Forge {
    /// Create a generator for `kind` ("item", "npc" or "tavern") from the
    /// embedded tables. A seed of 0 draws from entropy.
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str, seed: u64) -> Result<Forge, JsError> {
        let kind = AssetKind::from_name(kind)
            .ok_or_else(|| JsError::new(&format!("Unknown generator: {kind}")))?;
        let table = match kind {
            AssetKind::Item => data::MAGIC_ITEMS,
            AssetKind::Npc => data::NPCS,
            AssetKind::Tavern => data::TAVERNS,
        };
        Self::build(kind, table, false, (seed != 0).then_some(seed))
    }

    /// Create a generator from a table fetched by the page as JSON.
    pub fn from_json(kind: &str, table_json: &str, seed: u64) -> Result<Forge, JsError> {
        let kind = AssetKind::from_name(kind)
            .ok_or_else(|| JsError::new(&format!("Unknown generator: {kind}")))?;
        Self::build(kind, table_json, true, (seed != 0).then_some(seed))
    }

    /// Replace the NPC table used to guess races and jobs for promoted
    /// patrons.
    pub fn with_npc_table(&mut self, npc_json: &str) -> Result<(), JsError> {
        let npcs = NpcTable::parse_json(npc_json)
            .map_err(|e| JsError::new(&format!("Table parse error: {e}")))?;
        self.patrons = Some(
            PatronMatcher::new(&npcs.races, &npcs.jobs)
                .map_err(|e| JsError::new(&format!("Patron matcher error: {e}")))?,
        );
        Ok(())
    }

    pub fn kind(&self) -> String {
        on_desk!(&self.desk, bench => bench.kind().name().to_string())
    }

    /// JSON object of the category lists that feed the selection controls.
    pub fn categories(&self) -> Result<String, JsError> {
        let value = match &self.desk {
            Desk::Item(bench) => serde_json::json!({
                "types": bench.assembler().table().types,
                "powerLevels": bench.assembler().table().power_levels,
            }),
            Desk::Npc(bench) => serde_json::json!({
                "races": bench.assembler().table().races,
                "genders": GENDERS,
                "jobs": bench.assembler().table().jobs,
            }),
            Desk::Tavern(bench) => serde_json::json!({
                "types": bench.assembler().table().types,
                "qualities": bench.assembler().table().qualities,
            }),
        };
        to_json(&value)
    }

    pub fn filters(&self) -> Result<String, JsError> {
        on_desk!(&self.desk, bench => to_json(bench.filters()))
    }

    pub fn set_filters(&mut self, filters_json: &str) -> Result<(), JsError> {
        on_desk!(&mut self.desk, bench => set_filters(bench, filters_json))
    }

    /// Generate a record and return its view. `force` ignores the filters.
    pub fn generate(&mut self, force: bool) -> Result<String, JsError> {
        on_desk!(&mut self.desk, bench => {
            bench.generate(force).map_err(js)?;
            current_view(bench)
        })
    }

    /// JSON view of the current record.
    pub fn current(&self) -> Result<String, JsError> {
        on_desk!(&self.desk, bench => current_view(bench))
    }

    /// Toggle the lock on a field; returns whether it is now locked.
    pub fn toggle_lock(&mut self, field: &str) -> Result<bool, JsError> {
        on_desk!(&mut self.desk, bench => bench.toggle_lock(field_of(field)?).map_err(js))
    }

    /// Lock a field to an edited value.
    pub fn lock_with(&mut self, field: &str, value: &str) -> Result<(), JsError> {
        on_desk!(&mut self.desk, bench => bench.lock_with(field_of(field)?, value).map_err(js))
    }

    pub fn reveal(&mut self) -> Result<String, JsError> {
        on_desk!(&mut self.desk, bench => bench.reveal().map_err(js))
    }

    pub fn copy_text(&self) -> Result<String, JsError> {
        on_desk!(&self.desk, bench => bench.copy_text().map_err(js))
    }

    /// Save the current record; returns its id.
    pub fn save(&mut self) -> Result<f64, JsError> {
        let id = on_desk!(&mut self.desk, bench => bench.save_current().map_err(js))?;
        Ok(id as f64)
    }

    /// JSON array of saved entries, most recent first.
    pub fn history(&self) -> Result<String, JsError> {
        on_desk!(&self.desk, bench => to_json(bench.history().entries()))
    }

    pub fn delete(&mut self, id: f64) -> Result<bool, JsError> {
        on_desk!(&mut self.desk, bench => bench.delete_saved(id as u64).map_err(js))
    }

    pub fn clear_history(&mut self, confirmed: bool) -> Result<usize, JsError> {
        on_desk!(&mut self.desk, bench => bench.clear_history(confirmed).map_err(js))
    }

    /// Render the history as "json", "csv", "md" or "pdf". Returns
    /// `{fileName, mimeType, content}`.
    pub fn export(&self, format: &str) -> Result<String, JsError> {
        let format = ExportFormat::from_name(format)
            .ok_or_else(|| JsError::new(&format!("Unknown export format: {format}")))?;
        let document = on_desk!(&self.desk, bench => bench.export(format).map_err(js))?;
        to_json(&document)
    }

    pub fn reset(&mut self) {
        on_desk!(&mut self.desk, bench => bench.reset())
    }

    /// Queue the current tavern's innkeeper for the NPC page. Returns the
    /// queued total.
    pub fn promote_innkeeper(&mut self) -> Result<u32, JsError> {
        let Desk::Tavern(bench) = &self.desk else {
            return Err(JsError::new("Only the tavern generator can promote NPCs"));
        };
        let current = bench
            .current()
            .ok_or_else(|| js(instantforge::WorkbenchError::NothingGenerated(AssetKind::Tavern)))?;
        let request = promote_innkeeper(&current.resolved);
        self.handoff.append(&[request]).map_err(js)
    }

    /// Queue one NPC per patron. Returns `{added, total}`.
    pub fn promote_patrons(&mut self) -> Result<String, JsError> {
        let Desk::Tavern(bench) = &self.desk else {
            return Err(JsError::new("Only the tavern generator can promote NPCs"));
        };
        let current = bench
            .current()
            .ok_or_else(|| js(instantforge::WorkbenchError::NothingGenerated(AssetKind::Tavern)))?;
        let matcher = self
            .patrons
            .as_ref()
            .ok_or_else(|| JsError::new("No NPC table loaded for patron matching"))?;
        let requests = matcher
            .promote_patrons(&current.resolved)
            .ok_or_else(|| JsError::new(NO_PATRONS))?;
        let total = self.handoff.append(&requests).map_err(js)?;
        to_json(&Promotion {
            added: requests.len(),
            total,
        })
    }

    /// Total NPCs waiting in the handoff queue.
    pub fn pending_total(&self) -> u32 {
        self.handoff.total()
    }

    /// Generate every NPC the handoff queue asks for, then clear the
    /// queue. A failed generation leaves the queue in place. Returns a
    /// JSON array of record views.
    pub fn take_pending(&mut self) -> Result<String, JsError> {
        let Desk::Npc(bench) = &mut self.desk else {
            return Err(JsError::new("Only the NPC generator consumes queued requests"));
        };
        let assembler = bench.assembler_mut();
        let generated = self
            .handoff
            .consume(|pending| {
                assembler
                    .assemble_requests(pending)
                    .map_err(instantforge::WorkbenchError::from)
            })
            .map_err(js)?;
        log::info!("generated {} queued NPCs", generated.len());
        let views = generated
            .iter()
            .map(|a| view_of(a, None))
            .collect::<Result<Vec<_>, _>>()?;
        to_json(&views)
    }

    /// Return JSON array of generator identifiers.
    pub fn available_generators() -> String {
        serde_json::to_string(&AssetKind::ALL.map(AssetKind::name))
            .unwrap_or_else(|_| "[]".to_string())
    }
}

// Private helpers
impl Forge {
    fn build(
        kind: AssetKind,
        table: &str,
        json: bool,
        seed: Option<u64>,
    ) -> Result<Forge, JsError> {
        fn parse<T: FragmentTable>(src: &str, json: bool) -> Result<T, JsError> {
            let parsed = if json { T::parse_json(src) } else { T::parse_ron(src) };
            parsed.map_err(|e| JsError::new(&format!("Table parse error: {e}")))
        }

        let session = session_for(seed);
        let mut patrons = None;
        let desk = match kind {
            AssetKind::Item => Desk::Item(Workbench::new(
                ItemAssembler::new(parse::<ItemTable>(table, json)?, session),
                LocalStorage,
            )),
            AssetKind::Npc => Desk::Npc(Workbench::new(
                NpcAssembler::new(parse::<NpcTable>(table, json)?, session),
                LocalStorage,
            )),
            AssetKind::Tavern => {
                let npcs = parse::<NpcTable>(data::NPCS, false)?;
                patrons = Some(
                    PatronMatcher::new(&npcs.races, &npcs.jobs)
                        .map_err(|e| JsError::new(&format!("Patron matcher error: {e}")))?,
                );
                Desk::Tavern(Workbench::new(
                    TavernAssembler::new(parse::<TavernTable>(table, json)?, session),
                    LocalStorage,
                ))
            }
        };
        Ok(Forge {
            desk,
            handoff: HandoffQueue::new(SessionStorage),
            patrons,
        })
    }
}
