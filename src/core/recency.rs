/// Recency windows: per-category memory of recent picks used to avoid
/// repeating the same flavor text across consecutive generations.

use log::debug;
use rand::Rng;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::core::picker::pick;

/// Number of recent picks remembered per category.
pub const DEFAULT_WINDOW: usize = 10;

/// Most-recent-first history of values chosen for one category.
#[derive(Debug, Clone, Default)]
pub struct RecencyWindow {
    entries: VecDeque<String>,
}

impl RecencyWindow {
    pub fn contains(&self, value: &str) -> bool {
        self.entries.iter().any(|e| e == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently recorded value.
    pub fn front(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    fn push(&mut self, value: String, capacity: usize) {
        self.entries.push_front(value);
        while self.entries.len() > capacity {
            self.entries.pop_back();
        }
    }
}

/// Wraps the picker so a category does not repeat any of its last
/// `capacity` values while other candidates remain.
///
/// Windows live as long as the guard; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct RecencyGuard {
    capacity: usize,
    windows: FxHashMap<String, RecencyWindow>,
}

impl Default for RecencyGuard {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RecencyGuard {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            windows: FxHashMap::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pick a candidate not present in the category's window.
    ///
    /// When every candidate is in the window the pick falls back to the
    /// full list and accepts a repeat. An empty candidate list yields an
    /// empty string and leaves the window untouched.
    pub fn pick_unique<R>(&mut self, candidates: &[String], category: &str, rng: &mut R) -> String
    where
        R: Rng + ?Sized,
    {
        if candidates.is_empty() {
            return String::new();
        }

        let window = self.windows.entry(category.to_string()).or_default();
        let eligible: Vec<&String> = candidates
            .iter()
            .filter(|c| !window.contains(c))
            .collect();

        let chosen = match pick(&eligible, rng) {
            Some(c) => (*c).clone(),
            None => {
                debug!("recency window for '{}' exhausted, allowing a repeat", category);
                // candidates is non-empty here
                pick(candidates, rng).cloned().unwrap_or_default()
            }
        };

        window.push(chosen.clone(), self.capacity);
        chosen
    }

    /// Record a value chosen outside `pick_unique` (e.g. a sampled batch).
    pub fn record(&mut self, category: &str, value: &str) {
        let capacity = self.capacity;
        self.windows
            .entry(category.to_string())
            .or_default()
            .push(value.to_string(), capacity);
    }

    /// True if `value` is currently in the category's window.
    pub fn is_recent(&self, category: &str, value: &str) -> bool {
        self.windows
            .get(category)
            .map(|w| w.contains(value))
            .unwrap_or(false)
    }

    pub fn window(&self, category: &str) -> Option<&RecencyWindow> {
        self.windows.get(category)
    }

    /// Forget every window.
    pub fn reset(&mut self) {
        self.windows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("rumor {i}")).collect()
    }

    #[test]
    fn avoids_recent_values_while_others_remain() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut guard = RecencyGuard::default();
        let candidates = pool(25);

        for _ in 0..200 {
            let before: Vec<String> = guard
                .window("rumors")
                .map(|w| w.iter().map(str::to_string).collect())
                .unwrap_or_default();
            let chosen = guard.pick_unique(&candidates, "rumors", &mut rng);
            assert!(
                !before.contains(&chosen),
                "'{}' repeated while fresh candidates existed",
                chosen
            );
        }
    }

    #[test]
    fn window_never_exceeds_capacity_and_front_is_latest() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut guard = RecencyGuard::default();
        let candidates = pool(30);

        for _ in 0..50 {
            let chosen = guard.pick_unique(&candidates, "quirks", &mut rng);
            let window = guard.window("quirks").unwrap();
            assert!(window.len() <= DEFAULT_WINDOW);
            assert_eq!(window.front(), Some(chosen.as_str()));
        }
        assert_eq!(guard.window("quirks").unwrap().len(), DEFAULT_WINDOW);
    }

    #[test]
    fn exhausted_pool_falls_back_to_repeat() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut guard = RecencyGuard::default();
        let candidates = pool(3);

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(guard.pick_unique(&candidates, "voices", &mut rng));
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 3, "first three picks should be distinct");

        // All three are now recent; the guard must still answer.
        let fourth = guard.pick_unique(&candidates, "voices", &mut rng);
        assert!(candidates.contains(&fourth));
        assert_eq!(guard.window("voices").unwrap().len(), 4);
    }

    #[test]
    fn empty_candidates_leave_window_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut guard = RecencyGuard::default();
        let chosen = guard.pick_unique(&[], "secrets", &mut rng);
        assert_eq!(chosen, "");
        assert!(guard.window("secrets").is_none());
    }

    #[test]
    fn categories_are_independent() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut guard = RecencyGuard::default();
        let only = vec!["the same".to_string()];
        guard.pick_unique(&only, "hooks", &mut rng);
        assert!(guard.is_recent("hooks", "the same"));
        assert!(!guard.is_recent("goals", "the same"));
    }

    #[test]
    fn record_and_reset() {
        let mut guard = RecencyGuard::new(2);
        guard.record("patrons", "a");
        guard.record("patrons", "b");
        guard.record("patrons", "c");
        let window = guard.window("patrons").unwrap();
        assert_eq!(window.iter().collect::<Vec<_>>(), vec!["c", "b"]);

        guard.reset();
        assert!(guard.window("patrons").is_none());
    }
}
