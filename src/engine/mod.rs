//! Box-office engine.
//!
//! The engine routes buyer actions to one checkout per buyer and shares a
//! single inventory catalog per event between every buyer, so commits from
//! different buyers contend on the same counters.
//! Also supports async stream of actions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::catalog::{EventSource, InMemorySource, InventoryCatalog, LoadError};
use crate::checkout::Checkout;
use crate::config::Config;
use crate::model::{Action, BuyerId, EventId, Receipt, ReceiptId, TierId};

mod error;
pub use error::EngineError;

/// The box-office engine.
pub struct Engine<S = InMemorySource> {
    source: S,
    config: Config,
    /// Loaded on first use, shared by every checkout of the event
    catalogs: BTreeMap<EventId, Arc<InventoryCatalog>>,
    /// At most one open checkout per buyer
    checkouts: HashMap<BuyerId, Checkout>,
    receipts: Vec<(BuyerId, Receipt)>,
}

/// Public API
impl<S: EventSource> Engine<S> {
    pub fn new(source: S, config: Config) -> Self {
        Self {
            source,
            config,
            catalogs: BTreeMap::new(),
            checkouts: HashMap::new(),
            receipts: Vec::new(),
        }
    }

    /// Run the engine with the given action stream
    pub async fn run(&mut self, mut stream: impl Stream<Item = Action> + Unpin) {
        while let Some(action) = stream.next().await {
            // a rejected action must not stop the box office
            let _ = self.apply(action).await;
        }
    }

    /// Apply a single buyer action
    pub async fn apply(&mut self, action: Action) -> Result<(), EngineError> {
        let buyer = action.buyer();
        let name = action.name();
        let event = action.event().clone();

        let result = self.dispatch(action).await;
        Self::log_result(name, buyer, &event, &result);
        result
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self, event: &str) -> Option<&Arc<InventoryCatalog>> {
        self.catalogs.get(event)
    }

    /// Loaded catalogs, ordered by event id.
    pub fn catalogs(&self) -> impl Iterator<Item = &Arc<InventoryCatalog>> + '_ {
        self.catalogs.values()
    }

    pub fn checkout(&self, buyer: BuyerId) -> Option<&Checkout> {
        self.checkouts.get(&buyer)
    }

    /// Receipts in commit order.
    pub fn receipts(&self) -> impl Iterator<Item = &Receipt> + '_ {
        self.receipts.iter().map(|(_, receipt)| receipt)
    }

    pub fn receipts_for(&self, buyer: BuyerId) -> impl Iterator<Item = &Receipt> + '_ {
        self.receipts
            .iter()
            .filter(move |(owner, _)| *owner == buyer)
            .map(|(_, receipt)| receipt)
    }

    /// Cancel a committed order: its units go back to the catalog.
    pub async fn refund(&mut self, receipt: ReceiptId) -> Result<Receipt, EngineError> {
        let position = self
            .receipts
            .iter()
            .position(|(_, r)| r.id == receipt)
            .ok_or(EngineError::UnknownReceipt(receipt))?;

        let event = &self.receipts[position].1.event;
        let catalog = self
            .catalogs
            .get(event)
            .ok_or_else(|| LoadError::NotFound(event.clone()))?;

        let items: Vec<(TierId, u32)> = self.receipts[position]
            .1
            .lines
            .iter()
            .map(|line| (line.tier_id.clone(), line.quantity))
            .collect();
        catalog.release_all(&items).await?;

        let (buyer, receipt) = self.receipts.remove(position);
        info!(buyer, event = %receipt.event, receipt = %receipt.id, "refunded");
        Ok(receipt)
    }

    /// Re-fetch an event's tiers from the source and re-clamp every open
    /// checkout of that event against the fresh data.
    ///
    /// Units held by this engine's receipts stay sold across the refresh.
    pub async fn refresh(&mut self, event: &str) -> Result<(), EngineError> {
        let catalog = self.load_catalog(event).await?;
        self.catalogs.insert(event.to_string(), Arc::clone(&catalog));

        for (buyer, checkout) in self.checkouts.iter_mut() {
            if checkout.session().catalog().event() == event {
                let changed = checkout.rebind(Arc::clone(&catalog));
                debug!(buyer, event, changed, "checkout rebound to refreshed catalog");
            }
        }
        Ok(())
    }
}

/// Private API
impl<S: EventSource> Engine<S> {
    /// Small helper to log `apply` results
    fn log_result(
        action: &str,
        buyer: BuyerId,
        event: &EventId,
        result: &Result<(), EngineError>,
    ) {
        match result {
            Ok(()) => info!(buyer, event = %event, "{action} applied"),
            Err(e) => info!(buyer, event = %event, reason = %e, "{action} skipped"),
        }
    }

    async fn dispatch(&mut self, action: Action) -> Result<(), EngineError> {
        match action {
            Action::Set {
                buyer,
                event,
                tier,
                quantity,
            } => {
                let checkout = self.open_checkout(buyer, &event).await?;
                checkout
                    .set_quantity(&tier, quantity)
                    .ok_or(EngineError::UnknownTier(event, tier))?;
            }
            Action::Increment { buyer, event, tier } => {
                let checkout = self.open_checkout(buyer, &event).await?;
                checkout
                    .increment(&tier)
                    .ok_or(EngineError::UnknownTier(event, tier))?;
            }
            Action::Decrement { buyer, event, tier } => {
                let checkout = self.open_checkout(buyer, &event).await?;
                checkout
                    .decrement(&tier)
                    .ok_or(EngineError::UnknownTier(event, tier))?;
            }
            Action::AcceptTerms { buyer, event } => {
                self.open_checkout(buyer, &event).await?.accept_terms(true);
            }
            Action::Commit { buyer, event } => self.commit(buyer, event).await?,
            Action::Cancel { buyer, event } => {
                let mut checkout = self
                    .take_checkout(buyer, &event)
                    .ok_or(EngineError::NoCheckout(buyer, event))?;
                checkout.cancel();
            }
        }
        Ok(())
    }

    async fn commit(&mut self, buyer: BuyerId, event: EventId) -> Result<(), EngineError> {
        let checkout = self
            .checkouts
            .get_mut(&buyer)
            .filter(|checkout| checkout.session().catalog().event() == &event)
            .ok_or_else(|| EngineError::NoCheckout(buyer, event.clone()))?;

        match checkout.commit().await {
            Ok(receipt) => {
                self.receipts.push((buyer, receipt));
                Ok(())
            }
            Err(err) => {
                if err.is_retryable() {
                    let changed = checkout.revalidate();
                    if changed > 0 {
                        warn!(buyer, event = %event, changed, "selection re-clamped after failed commit");
                    }
                }
                Err(err.into())
            }
        }
    }

    /// The buyer's checkout for `event`, opening one (and discarding a
    /// checkout for another event) as needed.
    async fn open_checkout(
        &mut self,
        buyer: BuyerId,
        event: &str,
    ) -> Result<&mut Checkout, EngineError> {
        let current = self
            .checkouts
            .get(&buyer)
            .is_some_and(|checkout| checkout.session().catalog().event() == event);

        if !current {
            let catalog = self.catalog_for(event).await?;
            if let Some(mut previous) = self.checkouts.remove(&buyer) {
                debug!(
                    buyer,
                    from = %previous.session().catalog().event(),
                    to = event,
                    "buyer switched event, discarding checkout"
                );
                previous.cancel();
            }
            self.checkouts
                .insert(buyer, Checkout::new(catalog, &self.config));
        }

        self.checkouts
            .get_mut(&buyer)
            .ok_or_else(|| EngineError::NoCheckout(buyer, event.to_string()))
    }

    fn take_checkout(&mut self, buyer: BuyerId, event: &str) -> Option<Checkout> {
        let matches = self
            .checkouts
            .get(&buyer)
            .is_some_and(|checkout| checkout.session().catalog().event() == event);
        if matches {
            self.checkouts.remove(&buyer)
        } else {
            None
        }
    }

    async fn catalog_for(&mut self, event: &str) -> Result<Arc<InventoryCatalog>, LoadError> {
        if let Some(catalog) = self.catalogs.get(event) {
            return Ok(Arc::clone(catalog));
        }
        let catalog = self.load_catalog(event).await?;
        self.catalogs.insert(event.to_string(), Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Build `event`'s catalog from the source, minus the units this engine
    /// has sold and not refunded. The source never sees commits.
    async fn load_catalog(&self, event: &str) -> Result<Arc<InventoryCatalog>, LoadError> {
        let mut records = self
            .source
            .tiers(event)
            .await
            .ok_or_else(|| LoadError::NotFound(event.to_string()))?;

        let sold = self.sold(event);
        for record in &mut records {
            if let Some(&units) = sold.get(&record.id) {
                record.remaining = record.remaining.saturating_sub(units);
            }
        }

        let catalog = InventoryCatalog::new(event, records, self.config.reserve_timeout)?;
        debug!(event, tiers = catalog.len(), sold = sold.len(), "catalog loaded");
        Ok(Arc::new(catalog))
    }

    /// Units per tier held by receipts of `event`.
    fn sold(&self, event: &str) -> HashMap<&TierId, u32> {
        let mut sold = HashMap::new();
        for (_, receipt) in self.receipts.iter().filter(|(_, r)| r.event == event) {
            for line in &receipt.lines {
                let units: &mut u32 = sold.entry(&line.tier_id).or_default();
                *units = units.saturating_add(line.quantity);
            }
        }
        sold
    }
}

impl Default for Engine<InMemorySource> {
    fn default() -> Self {
        Self::new(InMemorySource::new(), Config::default())
    }
}
