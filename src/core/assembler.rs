/// Entity assembler contract: filters in, record plus resolved categories
/// out, with locked fields passed through and a bounded retry when the
/// fragment table has no data for a resolved combination.

use log::warn;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;

use crate::core::session::Session;
use crate::schema::fields::{AssetKind, FieldSet};
use crate::schema::record::Record;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("no valid category combination found after {attempts} attempts")]
    NoValidCombination { attempts: u32 },
    #[error("field '{0}' cannot be locked")]
    FieldNotLockable(&'static str),
}

/// Locked field values, carried from the caller's current record into the
/// next assembly. Only lockable fields can be held.
#[derive(Debug, Clone)]
pub struct Locks<F: FieldSet> {
    values: FxHashMap<F, String>,
}

impl<F: FieldSet> Default for Locks<F> {
    fn default() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }
}

impl<F: FieldSet> Locks<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&mut self, field: F, value: impl Into<String>) -> Result<(), AssembleError> {
        if !field.lockable() {
            return Err(AssembleError::FieldNotLockable(field.key()));
        }
        self.values.insert(field, value.into());
        Ok(())
    }

    /// Builder form of [`Locks::lock`].
    pub fn with(mut self, field: F, value: impl Into<String>) -> Result<Self, AssembleError> {
        self.lock(field, value)?;
        Ok(self)
    }

    pub fn unlock(&mut self, field: F) -> Option<String> {
        self.values.remove(&field)
    }

    pub fn is_locked(&self, field: F) -> bool {
        self.values.contains_key(&field)
    }

    pub fn value(&self, field: F) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Locked fields in declaration order.
    pub fn locked_fields(&self) -> Vec<F> {
        F::ALL.iter().copied().filter(|f| self.is_locked(*f)).collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Locked value if present, otherwise a freshly generated one.
    pub fn resolve(&self, field: F, generate: impl FnOnce() -> String) -> String {
        match self.value(field) {
            Some(locked) => locked.to_string(),
            None => generate(),
        }
    }
}

/// Result of one assembly: the record and the category values actually used.
#[derive(Debug, Clone)]
pub struct Assembled<F: FieldSet, R> {
    pub record: Record<F>,
    pub resolved: R,
}

/// One assembler per asset kind.
pub trait Assembler {
    type Field: FieldSet;
    /// Optional category selections. `Default` means "pick everything".
    type Filters: Default + Clone + Debug + Serialize + DeserializeOwned;
    /// The top-level categories chosen for a record.
    type Resolved: Clone + Debug + Serialize;

    fn kind(&self) -> AssetKind {
        <Self::Field as FieldSet>::KIND
    }

    fn session(&self) -> &Session;

    fn session_mut(&mut self) -> &mut Session;

    /// Produce a record. `force` re-randomizes every category, ignoring
    /// the filters.
    fn assemble(
        &mut self,
        filters: &Self::Filters,
        force: bool,
        locks: &Locks<Self::Field>,
    ) -> Result<Assembled<Self::Field, Self::Resolved>, AssembleError>;

    /// Filters that reproduce `resolved`, for reflecting back into
    /// selection controls.
    fn reflect(resolved: &Self::Resolved) -> Self::Filters;
}

/// Use the filter value when present and not forced, otherwise pick from
/// the full category list.
pub fn resolve_category<S: AsRef<str>>(
    session: &mut Session,
    selected: Option<&str>,
    force: bool,
    all: &[S],
) -> Option<String> {
    match selected {
        Some(value) if !force && !value.is_empty() => Some(value.to_string()),
        _ => session.pick(all).map(|s| s.as_ref().to_string()),
    }
}

/// Run `attempt` up to `max_attempts` times. The first call honours the
/// caller's `force` flag; every later call is fully forced. `attempt`
/// returns `None` when the combination it resolved has no usable data.
pub fn with_retries<T>(
    kind: AssetKind,
    max_attempts: u32,
    force: bool,
    mut attempt: impl FnMut(bool) -> Option<T>,
) -> Result<T, AssembleError> {
    let attempts = max_attempts.max(1);
    for n in 0..attempts {
        if let Some(result) = attempt(force || n > 0) {
            return Ok(result);
        }
        warn!(
            "{} assembly attempt {} of {} found no usable data; forcing re-randomization",
            kind.noun(),
            n + 1,
            attempts
        );
    }
    Err(AssembleError::NoValidCombination { attempts })
}
