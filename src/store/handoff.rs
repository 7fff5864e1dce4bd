use log::warn;
use serde::{Deserialize, Serialize};

use super::{KeyValueStore, StoreError};

/// Short-lived storage key shared by the tavern and NPC pages.
pub const HANDOFF_KEY: &str = "pendingNpcsForGeneration";

/// A request for the NPC generator. Empty `race`/`job` mean "any".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub quantity: u32,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub job: String,
    /// Free-text note describing who to generate.
    #[serde(default)]
    pub appearance: String,
}

/// The pending-request queue. Every operation reads, modifies and rewrites
/// the whole list in one call.
#[derive(Debug)]
pub struct HandoffQueue<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> HandoffQueue<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current queue; unreadable data reads as empty.
    pub fn pending(&self) -> Vec<PendingRequest> {
        match self.store.get(HANDOFF_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring unreadable handoff queue: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("could not read handoff queue: {}", e);
                Vec::new()
            }
        }
    }

    /// Total quantity queued.
    pub fn total(&self) -> u32 {
        total_quantity(&self.pending())
    }

    /// Append `requests` and return the new total quantity.
    pub fn append(&mut self, requests: &[PendingRequest]) -> Result<u32, StoreError> {
        let mut queue = self.pending();
        queue.extend_from_slice(requests);
        self.store.set(HANDOFF_KEY, &serde_json::to_string(&queue)?)?;
        Ok(total_quantity(&queue))
    }

    /// Hand the queue to `consume` and drop it only once `consume`
    /// succeeds. A failure leaves every request queued.
    pub fn consume<T, E>(
        &mut self,
        consume: impl FnOnce(&[PendingRequest]) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let queue = self.pending();
        let out = consume(&queue)?;
        if !queue.is_empty() {
            self.store.remove(HANDOFF_KEY)?;
        }
        Ok(out)
    }
}

/// Sum of requested quantities, saturating at `u32::MAX`.
pub fn total_quantity(requests: &[PendingRequest]) -> u32 {
    requests
        .iter()
        .fold(0u32, |total, r| total.saturating_add(r.quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn request(job: &str, quantity: u32) -> PendingRequest {
        PendingRequest {
            quantity,
            race: String::new(),
            job: job.to_string(),
            appearance: String::new(),
        }
    }

    #[test]
    fn append_accumulates_total() {
        let mut queue = HandoffQueue::new(MemoryStore::new());
        assert_eq!(queue.append(&[request("Innkeeper", 1)]).unwrap(), 1);
        let total = queue
            .append(&[request("Guard", 1), request("", 2)])
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(queue.pending().len(), 3);
        assert_eq!(queue.pending()[0].job, "Innkeeper");
    }

    #[test]
    fn consume_empties_queue_on_success() {
        let mut queue = HandoffQueue::new(MemoryStore::new());
        queue.append(&[request("Bard", 1)]).unwrap();
        let taken = queue
            .consume(|pending| Ok::<_, StoreError>(pending.to_vec()))
            .unwrap();
        assert_eq!(taken, vec![request("Bard", 1)]);
        assert!(queue.pending().is_empty());
        assert_eq!(queue.total(), 0);
    }

    #[test]
    fn consume_keeps_queue_on_failure() {
        let mut queue = HandoffQueue::new(MemoryStore::new());
        queue.append(&[request("Bard", 2)]).unwrap();
        let result = queue.consume(|_| -> Result<(), StoreError> {
            Err(StoreError::Backend("generation failed".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(queue.pending(), vec![request("Bard", 2)]);
        assert_eq!(queue.total(), 2);
    }

    #[test]
    fn total_saturates_instead_of_overflowing() {
        let mut queue = HandoffQueue::new(MemoryStore::new());
        let total = queue
            .append(&[request("Guard", u32::MAX), request("Bard", 1)])
            .unwrap();
        assert_eq!(total, u32::MAX);
        assert_eq!(queue.total(), u32::MAX);
    }

    #[test]
    fn reads_queue_written_by_the_page() {
        let raw = r#"[{"quantity":1,"race":"","job":"Innkeeper","appearance":"The innkeeper is stern."}]"#;
        let queue = HandoffQueue::new(MemoryStore::new().with_value(HANDOFF_KEY, raw));
        let pending = queue.pending();
        assert_eq!(pending[0].appearance, "The innkeeper is stern.");
        assert_eq!(queue.total(), 1);
    }
}
