use crate::models::{PolicyKind, RenderOutcome};
use dashmap::DashMap;
use std::sync::Arc;

type CacheKey = (PolicyKind, String);

/// In-memory memo of sanitized renders, keyed by the exact policy and raw
/// content. Clones share the same entries.
#[derive(Clone)]
pub struct RenderCache {
    entries: Arc<DashMap<CacheKey, RenderOutcome>>,
    capacity: usize,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            capacity,
        }
    }

    pub fn get(&self, kind: PolicyKind, raw: &str) -> Option<RenderOutcome> {
        self.entries
            .get(&(kind, raw.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Unsanitized outcomes are never stored. Once full, new keys are skipped.
    pub fn set(&self, kind: PolicyKind, raw: &str, outcome: &RenderOutcome) {
        if !outcome.is_sanitized() {
            return;
        }
        let key = (kind, raw.to_string());
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            tracing::debug!(capacity = self.capacity, "render cache full, skipping insert");
            return;
        }
        self.entries.insert(key, outcome.clone());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
