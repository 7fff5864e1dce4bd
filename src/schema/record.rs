use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::fields::{AssetKind, FieldSet};

/// Text shown in place of a concealed value until it is revealed.
pub const CONCEALED_PLACEHOLDER: &str = "(Click to reveal)";

/// The hidden-until-revealed bonus field (curse, secret or rumor).
///
/// The true value travels alongside the record but is never part of any
/// visible field; `display` returns the placeholder until `reveal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concealed {
    value: String,
    revealed: bool,
}

impl Concealed {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            revealed: false,
        }
    }

    /// What the presentation layer should show right now.
    pub fn display(&self) -> &str {
        if self.revealed {
            &self.value
        } else {
            CONCEALED_PLACEHOLDER
        }
    }

    /// The true value, out of band.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Reveal the value. Idempotent.
    pub fn reveal(&mut self) -> &str {
        self.revealed = true;
        &self.value
    }
}

/// One generated asset: visible fields keyed by an enumerated field set,
/// plus the concealed bonus.
///
/// Visible fields cannot be changed after assembly. Locking works by
/// feeding a prior value into the next assembly, not by mutation.
#[derive(Debug, Clone)]
pub struct Record<F: FieldSet> {
    values: FxHashMap<F, String>,
    concealed: Concealed,
}

impl<F: FieldSet> Record<F> {
    pub fn new(values: impl IntoIterator<Item = (F, String)>, concealed: Concealed) -> Self {
        Self {
            values: values.into_iter().collect(),
            concealed,
        }
    }

    pub fn kind(&self) -> AssetKind {
        F::KIND
    }

    /// Value of a visible field; empty if the assembler left it unset.
    pub fn get(&self, field: F) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.get(F::ALL[0])
    }

    /// Visible fields in declaration order.
    pub fn visible(&self) -> impl Iterator<Item = (F, &str)> + '_ {
        F::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    pub fn concealed(&self) -> &Concealed {
        &self.concealed
    }

    pub fn reveal(&mut self) -> &str {
        self.concealed.reveal()
    }

    /// Flatten into the persisted field map, concealed value included.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields: BTreeMap<String, String> = self
            .visible()
            .map(|(f, v)| (f.key().to_string(), v.to_string()))
            .collect();
        fields.insert(
            F::KIND.concealed().key.to_string(),
            self.concealed.value().to_string(),
        );
        fields
    }
}

/// A saved record: flat field map plus a creation-time identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedEntry {
    pub id: u64,
    #[serde(flatten, deserialize_with = "any_as_text")]
    pub fields: BTreeMap<String, String>,
}

/// Older or hand-edited saves may hold numbers, booleans or nulls. Read
/// them as text (null as empty) instead of rejecting the entry.
fn any_as_text<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

impl SavedEntry {
    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.field("name")
    }

    pub fn subtitle(&self) -> &str {
        self.field("subtitle")
    }
}
