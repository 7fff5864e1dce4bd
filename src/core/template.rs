/// Template compositor: token parsing and placeholder resolution.

use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::picker::pick;
use crate::core::recency::RecencyGuard;

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A named placeholder: `{name}`.
    Placeholder(String),
}

/// How a placeholder that appears more than once is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatPolicy {
    /// Only the first occurrence of each name is resolved; later
    /// occurrences stay verbatim.
    #[default]
    FirstOnly,
    /// Every occurrence is resolved. Draw bindings pick again each time.
    EachOccurrence,
}

/// A parsed template: a sequence of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string.
    ///
    /// `{name}` with a non-empty name of ASCII letters, digits or `_` is a
    /// placeholder. Any other brace is literal text, so parsing never fails
    /// and text without placeholders round-trips unchanged.
    pub fn parse(input: &str) -> Template {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            if chars[i] == '{' {
                let start = i + 1;
                let mut end = start;
                while end < len && chars[end] != '}' && chars[end] != '{' {
                    end += 1;
                }

                let closed = end < len && chars[end] == '}';
                let name: String = chars[start..end.min(len)].iter().collect();
                if closed && is_token_name(&name) {
                    if !literal_buf.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal_buf)));
                    }
                    segments.push(Segment::Placeholder(name));
                    i = end + 1;
                    continue;
                }
            }
            literal_buf.push(chars[i]);
            i += 1;
        }

        if !literal_buf.is_empty() {
            segments.push(Segment::Literal(literal_buf));
        }

        Template { segments }
    }

    /// Placeholder names in order of appearance, repeats included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Names that occur more than once.
    pub fn repeated_placeholders(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        let mut repeated = Vec::new();
        for name in self.placeholders() {
            if !seen.insert(name) && !repeated.contains(&name) {
                repeated.push(name);
            }
        }
        repeated
    }

    /// Resolve placeholders against `bindings`.
    ///
    /// Placeholders without a binding, or whose binding draws from an
    /// empty pool, are emitted verbatim. Bindings the template does not
    /// use are ignored.
    pub fn compose<R>(
        &self,
        bindings: &Bindings<'_>,
        policy: RepeatPolicy,
        guard: &mut RecencyGuard,
        rng: &mut R,
    ) -> String
    where
        R: Rng + ?Sized,
    {
        let mut out = String::new();
        let mut resolved: FxHashSet<&str> = FxHashSet::default();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let first = resolved.insert(name.as_str());
                    let value = if first || policy == RepeatPolicy::EachOccurrence {
                        bindings
                            .get(name)
                            .and_then(|binding| binding.resolve(guard, rng))
                    } else {
                        None
                    };
                    match value {
                        Some(v) => out.push_str(&v),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                }
            }
        }

        out
    }
}

fn is_token_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Where a placeholder's value comes from.
#[derive(Debug, Clone)]
pub enum Binding<'a> {
    /// A fixed value.
    Literal(String),
    /// A uniform pick from a pool.
    Draw(&'a [String]),
    /// A pick from a pool through the recency guard.
    DrawUnique { pool: &'a [String], category: &'a str },
}

impl Binding<'_> {
    fn resolve<R>(&self, guard: &mut RecencyGuard, rng: &mut R) -> Option<String>
    where
        R: Rng + ?Sized,
    {
        match self {
            Binding::Literal(value) => Some(value.clone()),
            Binding::Draw(pool) => pick(*pool, rng).cloned(),
            Binding::DrawUnique { pool, category } => {
                if pool.is_empty() {
                    None
                } else {
                    Some(guard.pick_unique(pool, category, rng))
                }
            }
        }
    }
}

/// Named bindings for one composition.
#[derive(Debug, Clone, Default)]
pub struct Bindings<'a> {
    map: FxHashMap<&'a str, Binding<'a>>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.map.insert(name, Binding::Literal(value.into()));
        self
    }

    pub fn draw(mut self, name: &'a str, pool: &'a [String]) -> Self {
        self.map.insert(name, Binding::Draw(pool));
        self
    }

    pub fn draw_unique(mut self, name: &'a str, pool: &'a [String], category: &'a str) -> Self {
        self.map.insert(name, Binding::DrawUnique { pool, category });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding<'a>> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }
}
