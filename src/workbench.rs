/// Per-generator controller: the current record, its locks and reveal
/// state, and the save/copy/export actions with their preconditions.

use log::info;
use thiserror::Error;

use crate::core::assembler::{AssembleError, Assembled, Assembler, Locks};
use crate::export::{self, ExportDocument, ExportError, ExportFormat};
use crate::schema::fields::{AssetKind, FieldSet};
use crate::schema::record::Record;
use crate::store::{History, KeyValueStore, StoreError};

/// Shown in copy text for a concealed value that has not been revealed.
pub const HIDDEN_MARKER: &str = "(hidden)";

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("Generate {} first!", .0.with_article())]
    NothingGenerated(AssetKind),
    #[error("clearing the saved history requires confirmation")]
    ConfirmationRequired,
    #[error("assembly error: {0}")]
    Assemble(#[from] AssembleError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

pub struct Workbench<A: Assembler, S: KeyValueStore> {
    assembler: A,
    store: S,
    history: History,
    filters: A::Filters,
    locks: Locks<A::Field>,
    current: Option<Assembled<A::Field, A::Resolved>>,
}

impl<A: Assembler, S: KeyValueStore> Workbench<A, S> {
    /// Wrap an assembler and load the saved history from `store`.
    pub fn new(assembler: A, store: S) -> Self {
        let history = History::load(assembler.kind(), &store);
        Self {
            assembler,
            store,
            history,
            filters: A::Filters::default(),
            locks: Locks::new(),
            current: None,
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.assembler.kind()
    }

    pub fn assembler(&self) -> &A {
        &self.assembler
    }

    pub fn assembler_mut(&mut self) -> &mut A {
        &mut self.assembler
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn filters(&self) -> &A::Filters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: A::Filters) {
        self.filters = filters;
    }

    pub fn locks(&self) -> &Locks<A::Field> {
        &self.locks
    }

    pub fn current(&self) -> Option<&Assembled<A::Field, A::Resolved>> {
        self.current.as_ref()
    }

    pub fn record(&self) -> Result<&Record<A::Field>, WorkbenchError> {
        self.current
            .as_ref()
            .map(|c| &c.record)
            .ok_or(WorkbenchError::NothingGenerated(self.kind()))
    }

    /// Generate a new record. Locked fields carry over; the resolved
    /// categories become the new filters.
    pub fn generate(
        &mut self,
        force: bool,
    ) -> Result<&Assembled<A::Field, A::Resolved>, WorkbenchError> {
        let assembled = self.assembler.assemble(&self.filters, force, &self.locks)?;
        self.filters = A::reflect(&assembled.resolved);
        Ok(&*self.current.insert(assembled))
    }

    /// Lock or unlock a field. Locking holds the current value (empty if
    /// nothing has been generated). Returns the new lock state.
    pub fn toggle_lock(&mut self, field: A::Field) -> Result<bool, WorkbenchError> {
        if self.locks.is_locked(field) {
            self.locks.unlock(field);
            return Ok(false);
        }
        let value = self
            .current
            .as_ref()
            .map(|c| c.record.get(field).to_string())
            .unwrap_or_default();
        self.locks.lock(field, value)?;
        Ok(true)
    }

    /// Lock a field to a caller-edited value.
    pub fn lock_with(
        &mut self,
        field: A::Field,
        value: impl Into<String>,
    ) -> Result<(), WorkbenchError> {
        self.locks.lock(field, value)?;
        Ok(())
    }

    pub fn unlock(&mut self, field: A::Field) {
        self.locks.unlock(field);
    }

    /// Reveal the concealed value of the current record.
    pub fn reveal(&mut self) -> Result<String, WorkbenchError> {
        let kind = self.kind();
        let current = self
            .current
            .as_mut()
            .ok_or(WorkbenchError::NothingGenerated(kind))?;
        Ok(current.record.reveal().to_string())
    }

    /// Plain-text summary of the current record for the clipboard.
    pub fn copy_text(&self) -> Result<String, WorkbenchError> {
        Ok(copy_text(self.record()?))
    }

    /// Save the current record at the top of the history.
    pub fn save_current(&mut self) -> Result<u64, WorkbenchError> {
        let kind = self.kind();
        let record = self
            .current
            .as_ref()
            .map(|c| &c.record)
            .ok_or(WorkbenchError::NothingGenerated(kind))?;
        let id = self.history.save(&mut self.store, record.to_fields())?;
        info!("saved {} {}", kind.noun(), id);
        Ok(id)
    }

    pub fn delete_saved(&mut self, id: u64) -> Result<bool, WorkbenchError> {
        Ok(self.history.delete(&mut self.store, id)?)
    }

    /// Delete every saved entry. Nothing happens on an empty, readable
    /// history; otherwise `confirmed` must be true.
    pub fn clear_history(&mut self, confirmed: bool) -> Result<usize, WorkbenchError> {
        if self.history.is_empty() && !self.history.is_unreadable() {
            return Ok(0);
        }
        if !confirmed {
            return Err(WorkbenchError::ConfirmationRequired);
        }
        Ok(self.history.clear(&mut self.store)?)
    }

    pub fn export(&self, format: ExportFormat) -> Result<ExportDocument, WorkbenchError> {
        Ok(export::export(self.kind(), self.history.entries(), format)?)
    }

    /// Forget the current record, filters and locks.
    pub fn reset(&mut self) {
        self.current = None;
        self.filters = A::Filters::default();
        self.locks.clear();
    }
}

/// Name, subtitle, then labelled fields with a `---` rule after the
/// kind's section break. The concealed value appears only once revealed.
pub fn copy_text<F: FieldSet>(record: &Record<F>) -> String {
    let kind = F::KIND;
    let mut lines = vec![
        format!("Name: {}", record.name()),
        record.get(F::ALL[1]).to_string(),
        "---".to_string(),
    ];
    for field in F::ALL.iter().skip(2) {
        lines.push(format!("{}: {}", field.copy_label(), record.get(*field)));
        if field.key() == kind.section_break_after() {
            lines.push("---".to_string());
        }
    }
    let concealed = record.concealed();
    let shown = if concealed.is_revealed() {
        concealed.value()
    } else {
        HIDDEN_MARKER
    };
    lines.push(format!("{}: {}", kind.concealed().label, shown));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields::{NpcField, TavernField};
    use crate::schema::record::Concealed;

    fn tavern() -> Record<TavernField> {
        Record::new(
            [
                (TavernField::Name, "The Crow".to_string()),
                (TavernField::Subtitle, "Poor Inn".to_string()),
                (TavernField::Description, "Drafty.".to_string()),
                (TavernField::Innkeeper, "The innkeeper is dour and hums.".to_string()),
                (TavernField::SignatureDrink, "Grog".to_string()),
                (TavernField::Patrons, "A nun.".to_string()),
            ],
            Concealed::new("The well is haunted."),
        )
    }

    #[test]
    fn copy_text_layout() {
        let text = copy_text(&tavern());
        assert_eq!(
            text,
            "Name: The Crow\nPoor Inn\n---\nDescription: Drafty.\nInnkeeper: The innkeeper is dour and hums.\nSignature Drink: Grog\n---\nPatrons: A nun.\nRumor: (hidden)"
        );
    }

    #[test]
    fn copy_text_shows_revealed_value() {
        let mut record = tavern();
        record.reveal();
        assert!(copy_text(&record).ends_with("Rumor: The well is haunted."));
    }

    #[test]
    fn nothing_generated_message() {
        let err = WorkbenchError::NothingGenerated(AssetKind::Npc);
        assert_eq!(err.to_string(), "Generate an NPC first!");
    }

    #[test]
    fn npc_copy_text_uses_short_voice_label() {
        let record = Record::new(
            [
                (NpcField::Name, "Bree Stone".to_string()),
                (NpcField::Subtitle, "Human Smith (female)".to_string()),
                (NpcField::Appearance, "tall; leather apron".to_string()),
                (NpcField::Details, "gruff; hums.".to_string()),
                (NpcField::VoiceMannerism, "deep; taps fingers.".to_string()),
                (NpcField::Hook, "Lost a cat.".to_string()),
                (NpcField::GoalOffer, "Retire. They can offer: a discount.".to_string()),
            ],
            Concealed::new("Owes the guild a fortune."),
        );
        let text = copy_text(&record);
        assert!(text.contains("\n---\nVoice: deep; taps fingers.\nHook: Lost a cat.\n"));
        assert!(!text.contains("Voice & Mannerism"));
        assert!(text.ends_with("Secret: (hidden)"));
    }
}
