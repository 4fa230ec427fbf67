//! Inventory catalog: the source of truth for tier definitions and remaining
//! counts of one event.
//!
//! Reads (`remaining_for`, `get_tier`, `tiers`) are lock-free snapshots.
//! Every write goes through a single writer lock so that a check-and-decrement,
//! or a whole multi-tier batch, is never interleaved with another buyer's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::Amount;
use crate::model::{EventId, TicketTier, TierId, TierRecord};

mod error;
pub use error::{InsufficientInventory, LoadError, ReserveError};

mod source;
pub use source::{EventSource, InMemorySource};

struct TierSlot {
    id: TierId,
    name: String,
    unit_price: Amount,
    remaining: AtomicU32,
}

impl TierSlot {
    fn snapshot(&self) -> TicketTier {
        TicketTier {
            id: self.id.clone(),
            name: self.name.clone(),
            unit_price: self.unit_price,
            remaining: self.remaining.load(Ordering::Acquire),
        }
    }
}

/// Ticket tiers of one event with their remaining inventory.
pub struct InventoryCatalog {
    event: EventId,
    /// Display order
    tiers: Vec<TierSlot>,
    index: HashMap<TierId, usize>,
    writer: Mutex<()>,
    reserve_timeout: Duration,
}

/// Public API
impl InventoryCatalog {
    /// Build a catalog from tier records, rejecting duplicate ids and negative prices.
    pub fn new(
        event: impl Into<EventId>,
        records: Vec<TierRecord>,
        reserve_timeout: Duration,
    ) -> Result<Self, LoadError> {
        let mut tiers = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());

        for record in records {
            if record.unit_price.is_negative() {
                return Err(LoadError::NegativePrice(record.id, record.unit_price));
            }
            if index.insert(record.id.clone(), tiers.len()).is_some() {
                return Err(LoadError::DuplicateTier(record.id));
            }
            tiers.push(TierSlot {
                id: record.id,
                name: record.name,
                unit_price: record.unit_price,
                remaining: AtomicU32::new(record.remaining),
            });
        }

        Ok(Self {
            event: event.into(),
            tiers,
            index,
            writer: Mutex::new(()),
            reserve_timeout,
        })
    }

    /// Fetch the tiers of `event` from `source` and build its catalog.
    pub async fn load<S: EventSource>(
        source: &S,
        event: &str,
        reserve_timeout: Duration,
    ) -> Result<Self, LoadError> {
        let records = source
            .tiers(event)
            .await
            .ok_or_else(|| LoadError::NotFound(event.to_string()))?;
        let catalog = Self::new(event, records, reserve_timeout)?;
        debug!(event, tiers = catalog.tiers.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn event(&self) -> &EventId {
        &self.event
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn contains(&self, tier: &str) -> bool {
        self.index.contains_key(tier)
    }

    /// Snapshot of every tier, in display order.
    pub fn tiers(&self) -> impl Iterator<Item = TicketTier> + '_ {
        self.tiers.iter().map(TierSlot::snapshot)
    }

    /// Tier ids in display order.
    pub fn tier_ids(&self) -> impl Iterator<Item = &TierId> + '_ {
        self.tiers.iter().map(|slot| &slot.id)
    }

    /// `None` when the tier is unknown to this catalog (a stale reference).
    pub fn get_tier(&self, tier: &str) -> Option<TicketTier> {
        self.slot(tier).map(TierSlot::snapshot)
    }

    pub fn unit_price(&self, tier: &str) -> Option<Amount> {
        self.slot(tier).map(|slot| slot.unit_price)
    }

    /// Remaining units of a tier; 0 for unknown tiers.
    pub fn remaining_for(&self, tier: &str) -> u32 {
        self.slot(tier)
            .map(|slot| slot.remaining.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Atomically take `quantity` units of one tier, or change nothing.
    pub async fn reserve(&self, tier: &str, quantity: u32) -> Result<(), ReserveError> {
        let slot = self
            .slot(tier)
            .ok_or_else(|| ReserveError::UnknownTier(tier.to_string()))?;

        let _guard = self.lock().await?;

        let remaining = slot.remaining.load(Ordering::Acquire);
        if remaining < quantity {
            return Err(InsufficientInventory {
                tier: slot.id.clone(),
                remaining,
                requested: quantity,
            }
            .into());
        }
        slot.remaining.store(remaining - quantity, Ordering::Release);

        debug!(event = %self.event, tier, quantity, remaining = remaining - quantity, "reserved");
        Ok(())
    }

    /// Take units of several tiers as one transaction: every tier is checked
    /// before any counter moves, so on failure nothing has changed.
    /// Repeated tier ids are summed.
    pub async fn reserve_all(&self, items: &[(TierId, u32)]) -> Result<(), ReserveError> {
        let demand = self.demand(items)?;

        let _guard = self.lock().await?;

        for &(idx, requested) in &demand {
            let slot = &self.tiers[idx];
            let remaining = slot.remaining.load(Ordering::Acquire);
            if remaining < requested {
                return Err(InsufficientInventory {
                    tier: slot.id.clone(),
                    remaining,
                    requested,
                }
                .into());
            }
        }

        for &(idx, requested) in &demand {
            self.tiers[idx]
                .remaining
                .fetch_sub(requested, Ordering::AcqRel);
        }

        debug!(event = %self.event, tiers = demand.len(), "batch reserved");
        Ok(())
    }

    /// Return `quantity` units to a tier.
    pub async fn release(&self, tier: &str, quantity: u32) -> Result<(), ReserveError> {
        self.release_all(&[(tier.to_string(), quantity)]).await
    }

    /// Return units to several tiers as one transaction.
    pub async fn release_all(&self, items: &[(TierId, u32)]) -> Result<(), ReserveError> {
        let demand = self.demand(items)?;

        let _guard = self.lock().await?;

        for &(idx, quantity) in &demand {
            let slot = &self.tiers[idx];
            let _ = slot
                .remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    Some(current.saturating_add(quantity))
                });
        }

        debug!(event = %self.event, tiers = demand.len(), "released");
        Ok(())
    }
}

/// Private API
impl InventoryCatalog {
    fn slot(&self, tier: &str) -> Option<&TierSlot> {
        self.index.get(tier).map(|&idx| &self.tiers[idx])
    }

    /// Resolve tier ids to slot indices, merging repeats.
    fn demand(&self, items: &[(TierId, u32)]) -> Result<Vec<(usize, u32)>, ReserveError> {
        let mut demand: Vec<(usize, u32)> = Vec::with_capacity(items.len());
        for (tier, quantity) in items {
            let idx = *self
                .index
                .get(tier)
                .ok_or_else(|| ReserveError::UnknownTier(tier.clone()))?;
            match demand.iter_mut().find(|(i, _)| *i == idx) {
                Some((_, total)) => *total = total.saturating_add(*quantity),
                None => demand.push((idx, *quantity)),
            }
        }
        Ok(demand)
    }

    async fn lock(&self) -> Result<MutexGuard<'_, ()>, ReserveError> {
        tokio::time::timeout(self.reserve_timeout, self.writer.lock())
            .await
            .map_err(|_| ReserveError::Timeout(self.reserve_timeout))
    }

    #[cfg(test)]
    pub(crate) async fn hold_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }
}

impl std::fmt::Debug for InventoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryCatalog")
            .field("event", &self.event)
            .field("tiers", &self.tiers().collect::<Vec<_>>())
            .finish()
    }
}
