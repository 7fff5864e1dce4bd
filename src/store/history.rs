use log::{error, info, warn};
use std::collections::BTreeMap;

use super::{KeyValueStore, StoreError};
use crate::schema::fields::AssetKind;
use crate::schema::record::SavedEntry;

/// Saved entries for one asset kind, most recent first.
///
/// Every change rewrites the whole list under the kind's storage key. The
/// in-memory list only changes once that write succeeds.
///
/// Stored data that cannot be read is never overwritten by a save or a
/// delete; only an explicit clear replaces it.
#[derive(Debug, Clone)]
pub struct History {
    kind: AssetKind,
    entries: Vec<SavedEntry>,
    unreadable: bool,
}

impl History {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            unreadable: false,
        }
    }

    /// Read the saved list. Missing data is an empty history. Unreadable
    /// data shows as empty and blocks writes until cleared.
    pub fn load<S: KeyValueStore>(kind: AssetKind, store: &S) -> Self {
        let raw = match store.get(kind.storage_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(kind),
            Err(e) => {
                warn!("could not read {}: {}", kind.storage_key(), e);
                return Self::unreadable(kind);
            }
        };
        match serde_json::from_str::<Vec<SavedEntry>>(&raw) {
            Ok(entries) => {
                info!("loaded {} saved {} entries", entries.len(), kind.noun());
                Self {
                    kind,
                    entries,
                    unreadable: false,
                }
            }
            Err(e) => {
                warn!("keeping unreadable {} untouched: {}", kind.storage_key(), e);
                Self::unreadable(kind)
            }
        }
    }

    fn unreadable(kind: AssetKind) -> Self {
        Self {
            unreadable: true,
            ..Self::new(kind)
        }
    }

    /// Whether the stored list could not be read at load time.
    pub fn is_unreadable(&self) -> bool {
        self.unreadable
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn entries(&self) -> &[SavedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&SavedEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Save with the current wall-clock time in milliseconds as the id.
    pub fn save<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        fields: BTreeMap<String, String>,
    ) -> Result<u64, StoreError> {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        self.save_at(store, fields, now)
    }

    /// Prepend a new entry. The id is `now_ms`, bumped past any id already
    /// in use.
    pub fn save_at<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        fields: BTreeMap<String, String>,
        now_ms: u64,
    ) -> Result<u64, StoreError> {
        self.ensure_writable()?;
        let mut id = now_ms;
        while self.get(id).is_some() {
            id += 1;
        }
        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.push(SavedEntry { id, fields });
        next.extend(self.entries.iter().cloned());
        self.commit(store, next)?;
        Ok(id)
    }

    /// Remove the entry with `id`. Returns whether one was removed.
    pub fn delete<S: KeyValueStore>(&mut self, store: &mut S, id: u64) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next: Vec<SavedEntry> = self.entries.iter().filter(|e| e.id != id).cloned().collect();
        self.commit(store, next)?;
        Ok(true)
    }

    /// Remove everything, including unreadable stored data. Returns how
    /// many entries were removed; an empty, readable history is left alone.
    pub fn clear<S: KeyValueStore>(&mut self, store: &mut S) -> Result<usize, StoreError> {
        let removed = self.entries.len();
        if removed == 0 && !self.unreadable {
            return Ok(0);
        }
        self.commit(store, Vec::new())?;
        self.unreadable = false;
        Ok(removed)
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.unreadable {
            return Err(StoreError::Unreadable(self.kind.storage_key().to_string()));
        }
        Ok(())
    }

    fn commit<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        next: Vec<SavedEntry>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(&next)?;
        if let Err(e) = store.set(self.kind.storage_key(), &json) {
            error!("failed to write {}: {}", self.kind.storage_key(), e);
            return Err(e);
        }
        self.entries = next;
        Ok(())
    }
}
