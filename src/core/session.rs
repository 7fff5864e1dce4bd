/// Generation session: the randomness source and recency windows owned by
/// one assembler for as long as its page lives.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::picker;
use crate::core::recency::{RecencyGuard, DEFAULT_WINDOW};
use crate::core::template::{Bindings, RepeatPolicy, Template};

/// Tunables shared by every assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Recent picks remembered per category.
    pub recency_window: usize,
    /// Attempts (the first plus forced re-randomizations) before an
    /// assembler gives up on finding a usable category combination.
    pub max_attempts: u32,
    pub repeat_policy: RepeatPolicy,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            recency_window: DEFAULT_WINDOW,
            max_attempts: 4,
            repeat_policy: RepeatPolicy::FirstOnly,
        }
    }
}

/// Owns all mutable generation state: RNG plus recency windows.
#[derive(Debug, Clone)]
pub struct Session {
    rng: StdRng,
    guard: RecencyGuard,
    config: ForgeConfig,
}

impl Session {
    /// Deterministic session, for tests and reproducible previews.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        let config = ForgeConfig::default();
        Self {
            rng,
            guard: RecencyGuard::new(config.recency_window),
            config,
        }
    }

    /// Replace the configuration. Recency windows are rebuilt empty.
    pub fn with_config(mut self, config: ForgeConfig) -> Self {
        self.guard = RecencyGuard::new(config.recency_window);
        self.config = config;
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn guard(&self) -> &RecencyGuard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut RecencyGuard {
        &mut self.guard
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        picker::pick(items, &mut self.rng)
    }

    pub fn sample<'a, T>(&mut self, items: &'a [T], k: usize) -> Vec<&'a T> {
        picker::sample(items, k, &mut self.rng)
    }

    pub fn pick_unique(&mut self, candidates: &[String], category: &str) -> String {
        self.guard.pick_unique(candidates, category, &mut self.rng)
    }

    /// True with probability `p` (clamped to `0.0..=1.0`).
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < p.min(1.0)
    }

    /// Uniform integer in `low..=high`.
    pub fn between(&mut self, low: usize, high: usize) -> usize {
        self.rng.gen_range(low..=high)
    }

    /// Parse `template` and resolve it with this session's RNG and windows.
    pub fn compose(&mut self, template: &str, bindings: &Bindings<'_>) -> String {
        Template::parse(template).compose(
            bindings,
            self.config.repeat_policy,
            &mut self.guard,
            &mut self.rng,
        )
    }
}
