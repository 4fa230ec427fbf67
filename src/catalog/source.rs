//! Event data sources feeding [`InventoryCatalog::load`](super::InventoryCatalog::load).

use std::collections::HashMap;
use std::future::Future;

use crate::model::{EventId, TierRecord};

/// Supplies the tier records of an event, in display order.
///
/// `None` means the event (or its tiers) cannot be resolved.
pub trait EventSource {
    fn tiers(&self, event: &str) -> impl Future<Output = Option<Vec<TierRecord>>> + Send;
}

/// Fixture-backed source.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    events: HashMap<EventId, Vec<TierRecord>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tier to an event, keeping insertion order.
    pub fn insert(&mut self, event: impl Into<EventId>, record: TierRecord) {
        self.events.entry(event.into()).or_default().push(record);
    }

    pub fn with_event(mut self, event: impl Into<EventId>, records: Vec<TierRecord>) -> Self {
        self.events.insert(event.into(), records);
        self
    }

    /// Known event ids, sorted.
    pub fn events(&self) -> Vec<EventId> {
        let mut events: Vec<_> = self.events.keys().cloned().collect();
        events.sort();
        events
    }

    /// Replace an event's tiers, e.g. when the backend restocks.
    pub fn replace(&mut self, event: impl Into<EventId>, records: Vec<TierRecord>) {
        self.events.insert(event.into(), records);
    }
}

impl FromIterator<(EventId, TierRecord)> for InMemorySource {
    fn from_iter<I: IntoIterator<Item = (EventId, TierRecord)>>(iter: I) -> Self {
        let mut source = Self::new();
        for (event, record) in iter {
            source.insert(event, record);
        }
        source
    }
}

impl EventSource for InMemorySource {
    async fn tiers(&self, event: &str) -> Option<Vec<TierRecord>> {
        self.events
            .get(event)
            .filter(|records| !records.is_empty())
            .cloned()
    }
}
