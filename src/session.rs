//! A buyer's in-progress ticket selection for one event.
//!
//! The session holds no authority over availability: every change is clamped
//! against the catalog's live `remaining` counts and the per-order cap.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::InventoryCatalog;
use crate::model::{SelectionEntry, TierId};

/// Chosen quantities per tier, bounded by catalog availability.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    catalog: Arc<InventoryCatalog>,
    per_order_cap: u32,
    /// Only non-zero quantities are kept
    chosen: HashMap<TierId, u32>,
}

impl SelectionSession {
    pub fn new(catalog: Arc<InventoryCatalog>, per_order_cap: u32) -> Self {
        Self {
            catalog,
            per_order_cap,
            chosen: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<InventoryCatalog> {
        &self.catalog
    }

    pub fn per_order_cap(&self) -> u32 {
        self.per_order_cap
    }

    /// Currently chosen quantity of a tier (0 when not selected).
    pub fn quantity(&self, tier: &str) -> u32 {
        self.chosen.get(tier).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    /// Store `desired` clamped to `[0, min(remaining, cap)]` and return the applied value.
    ///
    /// Returns `None`, changing nothing, when the tier is unknown to the catalog.
    pub fn set_quantity(&mut self, tier: &str, desired: u32) -> Option<u32> {
        if !self.catalog.contains(tier) {
            debug!(event = %self.catalog.event(), tier, "ignoring unknown tier");
            return None;
        }

        let applied = desired.min(self.bound(tier));
        if applied == 0 {
            self.chosen.remove(tier);
        } else {
            self.chosen.insert(tier.to_string(), applied);
        }
        Some(applied)
    }

    pub fn increment(&mut self, tier: &str) -> Option<u32> {
        let current = self.quantity(tier);
        self.set_quantity(tier, current.saturating_add(1))
    }

    pub fn decrement(&mut self, tier: &str) -> Option<u32> {
        let current = self.quantity(tier);
        self.set_quantity(tier, current.saturating_sub(1))
    }

    pub fn clear(&mut self) {
        self.chosen.clear();
    }

    /// Chosen entries in the catalog's display order, each clamped to what
    /// the catalog can still supply. Entries clamped to zero are left out.
    ///
    /// Clamping here does not touch the stored choices; `revalidate` does.
    pub fn entries(&self) -> Vec<SelectionEntry> {
        self.requested()
            .into_iter()
            .filter_map(|mut entry| {
                entry.quantity = entry.quantity.min(self.bound(&entry.tier_id));
                (entry.quantity > 0).then_some(entry)
            })
            .collect()
    }

    /// Stored choices in display order, as the buyer made them.
    pub(crate) fn requested(&self) -> Vec<SelectionEntry> {
        self.catalog
            .tier_ids()
            .filter_map(|tier| {
                self.chosen.get(tier).map(|&quantity| SelectionEntry {
                    tier_id: tier.clone(),
                    quantity,
                })
            })
            .collect()
    }

    /// Re-clamp every entry to the current bounds and prune entries for tiers
    /// the catalog no longer has. Returns how many entries changed.
    pub fn revalidate(&mut self) -> usize {
        let mut changed = 0;
        let catalog = &self.catalog;
        let cap = self.per_order_cap;

        self.chosen.retain(|tier, quantity| {
            if !catalog.contains(tier) {
                changed += 1;
                return false;
            }
            let bound = catalog.remaining_for(tier).min(cap);
            if *quantity > bound {
                *quantity = bound;
                changed += 1;
            }
            *quantity > 0
        });

        if changed > 0 {
            debug!(event = %self.catalog.event(), changed, "selection revalidated");
        }
        changed
    }

    /// Point the session at freshly fetched catalog data and re-clamp.
    pub fn rebind(&mut self, catalog: Arc<InventoryCatalog>) -> usize {
        self.catalog = catalog;
        self.revalidate()
    }

    fn bound(&self, tier: &str) -> u32 {
        self.catalog.remaining_for(tier).min(self.per_order_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Amount;
    use crate::model::TierRecord;
    use std::time::Duration;

    fn catalog(tiers: &[(&str, i64, u32)]) -> Arc<InventoryCatalog> {
        let records = tiers
            .iter()
            .map(|&(id, price, remaining)| {
                TierRecord::new(id, id.to_uppercase(), Amount::from_minor(price), remaining)
            })
            .collect();
        Arc::new(InventoryCatalog::new("1", records, Duration::from_secs(5)).unwrap())
    }

    fn festival() -> Arc<InventoryCatalog> {
        catalog(&[("ga", 7500, 500), ("vip", 15_000, 100), ("vvip", 25_000, 2)])
    }

    #[test]
    fn new_session_is_empty() {
        let session = SelectionSession::new(festival(), 10);
        assert!(session.is_empty());
        assert!(session.entries().is_empty());
        assert_eq!(session.per_order_cap(), 10);
    }

    // set_quantity clamping

    #[test]
    fn set_quantity_within_bounds_is_stored() {
        let mut session = SelectionSession::new(festival(), 10);
        assert_eq!(session.set_quantity("ga", 4), Some(4));
        assert_eq!(session.quantity("ga"), 4);
    }

    #[test]
    fn set_quantity_clamps_to_remaining() {
        let mut session = SelectionSession::new(festival(), 10);
        assert_eq!(session.set_quantity("vvip", 5), Some(2));
        assert_eq!(session.quantity("vvip"), 2);
    }

    #[test]
    fn set_quantity_clamps_to_cap() {
        let mut session = SelectionSession::new(festival(), 10);
        assert_eq!(session.set_quantity("ga", 50), Some(10));
    }

    #[test]
    fn clamping_holds_for_every_request() {
        let catalog = catalog(&[("a", 100, 0), ("b", 100, 3), ("c", 100, 10), ("d", 100, 40)]);
        let cap = 10;
        let mut session = SelectionSession::new(Arc::clone(&catalog), cap);

        for tier in catalog.tiers() {
            for requested in 0..=45 {
                session.set_quantity(&tier.id, requested);
                let expected = requested.min(tier.remaining.min(cap));
                assert_eq!(session.quantity(&tier.id), expected, "tier {} q {requested}", tier.id);
            }
        }
    }

    #[test]
    fn set_quantity_zero_removes_entry() {
        let mut session = SelectionSession::new(festival(), 10);
        session.set_quantity("ga", 3);
        assert_eq!(session.set_quantity("ga", 0), Some(0));
        assert!(session.is_empty());
    }

    #[test]
    fn sold_out_tier_cannot_be_selected() {
        let mut session = SelectionSession::new(catalog(&[("ga", 7500, 0)]), 10);
        assert_eq!(session.set_quantity("ga", 1), Some(0));
        assert!(session.is_empty());
    }

    #[test]
    fn unknown_tier_is_noop() {
        let mut session = SelectionSession::new(festival(), 10);
        session.set_quantity("ga", 1);
        assert_eq!(session.set_quantity("backstage", 3), None);
        assert_eq!(session.increment("backstage"), None);
        assert_eq!(session.entries().len(), 1);
    }

    // increment / decrement

    #[test]
    fn increment_stops_at_bound() {
        let mut session = SelectionSession::new(festival(), 10);
        assert_eq!(session.increment("vvip"), Some(1));
        assert_eq!(session.increment("vvip"), Some(2));
        assert_eq!(session.increment("vvip"), Some(2));
    }

    #[test]
    fn decrement_below_zero_clamps_and_removes() {
        let mut session = SelectionSession::new(festival(), 10);
        session.increment("ga");
        assert_eq!(session.decrement("ga"), Some(0));
        assert_eq!(session.decrement("ga"), Some(0));
        assert!(session.is_empty());
    }

    // entries / clear

    #[test]
    fn entries_follow_catalog_order() {
        let mut session = SelectionSession::new(festival(), 10);
        session.set_quantity("vvip", 1);
        session.set_quantity("ga", 2);
        session.set_quantity("vip", 3);

        let ids: Vec<_> = session.entries().into_iter().map(|e| e.tier_id).collect();
        assert_eq!(ids, ["ga", "vip", "vvip"]);
    }

    #[test]
    fn clear_empties_session() {
        let mut session = SelectionSession::new(festival(), 10);
        session.set_quantity("ga", 2);
        session.set_quantity("vip", 1);
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.quantity("ga"), 0);
    }

    // revalidate

    #[tokio::test]
    async fn revalidate_reclamps_after_inventory_shrinks() {
        let catalog = festival();
        let mut session = SelectionSession::new(Arc::clone(&catalog), 10);
        session.set_quantity("vvip", 2);
        session.set_quantity("ga", 3);

        catalog.reserve("vvip", 1).await.unwrap();
        assert_eq!(session.quantity("vvip"), 2);

        assert_eq!(session.revalidate(), 1);
        assert_eq!(session.quantity("vvip"), 1);
        assert_eq!(session.quantity("ga"), 3);
    }

    #[tokio::test]
    async fn entries_reclamp_when_inventory_shrinks() {
        let catalog = festival();
        let mut session = SelectionSession::new(Arc::clone(&catalog), 10);
        session.set_quantity("ga", 3);
        session.set_quantity("vvip", 2);

        catalog.reserve("vvip", 1).await.unwrap();
        let entries = session.entries();
        assert_eq!(entries[1].quantity, 1);

        catalog.reserve("vvip", 1).await.unwrap();
        let entries = session.entries();
        assert_eq!(
            entries,
            [SelectionEntry {
                tier_id: "ga".to_string(),
                quantity: 3,
            }]
        );

        // stored choice is untouched until revalidate
        assert_eq!(session.quantity("vvip"), 2);
        assert_eq!(session.requested().len(), 2);
    }

    #[tokio::test]
    async fn revalidate_prunes_sold_out_tiers() {
        let catalog = festival();
        let mut session = SelectionSession::new(Arc::clone(&catalog), 10);
        session.set_quantity("vvip", 2);

        catalog.reserve("vvip", 2).await.unwrap();

        assert_eq!(session.revalidate(), 1);
        assert!(session.is_empty());
    }

    #[test]
    fn rebind_prunes_tiers_missing_from_refreshed_catalog() {
        let mut session = SelectionSession::new(festival(), 10);
        session.set_quantity("ga", 4);
        session.set_quantity("vip", 2);

        let refreshed = catalog(&[("ga", 7500, 3)]);
        assert_eq!(session.rebind(refreshed), 2);

        assert_eq!(session.quantity("ga"), 3);
        assert_eq!(session.quantity("vip"), 0);
        assert_eq!(session.entries().len(), 1);
    }

    #[test]
    fn revalidate_without_changes_returns_zero() {
        let mut session = SelectionSession::new(festival(), 10);
        session.set_quantity("ga", 4);
        assert_eq!(session.revalidate(), 0);
        assert_eq!(session.quantity("ga"), 4);
    }
}
