//! Checkout: totals, commit gating, and the all-or-nothing commit of a
//! selection against its catalog.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Amount;
use crate::catalog::InventoryCatalog;
use crate::config::Config;
use crate::model::{CheckoutSummary, Receipt, ReceiptLine, TierId};
use crate::session::SelectionSession;

mod error;
pub use error::CommitError;

/// Lifecycle of one checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Selecting,
    ReadyToCommit,
    Committing,
    Committed,
    /// Commit rejected; the selection is kept for adjustment.
    Failed,
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Selecting => "selecting",
            CheckoutState::ReadyToCommit => "ready",
            CheckoutState::Committing => "committing",
            CheckoutState::Committed => "committed",
            CheckoutState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Total quantity and price of a selection. Tiers the catalog no longer
/// knows are ignored.
pub fn summarize(session: &SelectionSession) -> CheckoutSummary {
    let catalog = session.catalog();
    session
        .entries()
        .iter()
        .filter_map(|entry| {
            catalog
                .unit_price(&entry.tier_id)
                .map(|price| (entry.quantity, price.times(entry.quantity)))
        })
        .fold(CheckoutSummary::default(), |mut summary, (quantity, price)| {
            summary.total_quantity = summary.total_quantity.saturating_add(quantity);
            summary.total_price += price;
            summary
        })
}

/// Precondition check only: something is selected and, where required, the
/// terms are accepted. Does not reserve anything.
pub fn can_commit(session: &SelectionSession, terms_satisfied: bool) -> bool {
    terms_satisfied && summarize(session).total_quantity > 0
}

/// One buyer's checkout flow for one event.
#[derive(Debug, Clone)]
pub struct Checkout {
    session: SelectionSession,
    require_terms: bool,
    terms_accepted: bool,
    state: CheckoutState,
}

/// Public API
impl Checkout {
    pub fn new(catalog: Arc<InventoryCatalog>, config: &Config) -> Self {
        Self {
            session: SelectionSession::new(catalog, config.per_order_cap),
            require_terms: config.require_terms,
            terms_accepted: false,
            state: CheckoutState::Idle,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn session(&self) -> &SelectionSession {
        &self.session
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    pub fn set_quantity(&mut self, tier: &str, quantity: u32) -> Option<u32> {
        let applied = self.session.set_quantity(tier, quantity)?;
        self.refresh_state();
        Some(applied)
    }

    pub fn increment(&mut self, tier: &str) -> Option<u32> {
        let applied = self.session.increment(tier)?;
        self.refresh_state();
        Some(applied)
    }

    pub fn decrement(&mut self, tier: &str) -> Option<u32> {
        let applied = self.session.decrement(tier)?;
        self.refresh_state();
        Some(applied)
    }

    pub fn accept_terms(&mut self, accepted: bool) {
        self.terms_accepted = accepted;
        if self.state != CheckoutState::Idle {
            self.refresh_state();
        }
    }

    /// Re-clamp the selection against current availability.
    pub fn revalidate(&mut self) -> usize {
        let changed = self.session.revalidate();
        if changed > 0 && self.state != CheckoutState::Idle {
            self.refresh_state();
        }
        changed
    }

    /// Switch to refreshed catalog data for the same event.
    pub fn rebind(&mut self, catalog: Arc<InventoryCatalog>) -> usize {
        let changed = self.session.rebind(catalog);
        if self.state != CheckoutState::Idle {
            self.refresh_state();
        }
        changed
    }

    pub fn summary(&self) -> CheckoutSummary {
        summarize(&self.session)
    }

    pub fn can_commit(&self) -> bool {
        can_commit(&self.session, self.terms_satisfied())
    }

    /// Abandon the attempt. Nothing was reserved, so nothing is released.
    pub fn cancel(&mut self) {
        self.session.clear();
        self.terms_accepted = false;
        self.transition(CheckoutState::Idle);
    }

    /// Reserve every selected tier in one all-or-nothing step.
    ///
    /// The stored quantities are reserved as chosen, so a selection that went
    /// stale fails as a conflict rather than buying fewer tickets.
    /// On success the session is cleared and the checkout returns to idle.
    /// On failure the catalog is untouched and the selection is kept.
    /// Dropping the future before it finishes restores the previous state.
    pub async fn commit(&mut self) -> Result<Receipt, CommitError> {
        let entries = self.session.requested();
        if entries.is_empty() {
            return Err(CommitError::EmptySelection);
        }
        if !self.terms_satisfied() {
            return Err(CommitError::TermsNotAccepted);
        }

        let catalog = Arc::clone(self.session.catalog());
        let items: Vec<(TierId, u32)> = entries
            .iter()
            .map(|entry| (entry.tier_id.clone(), entry.quantity))
            .collect();

        let attempt = CommitAttempt::begin(&mut self.state);

        if let Err(err) = catalog.reserve_all(&items).await {
            let err = CommitError::from_reserve(err, items.len());
            warn!(
                event = %catalog.event(),
                reason = %err,
                retryable = err.is_retryable(),
                "commit failed"
            );
            attempt.finish(CheckoutState::Failed);
            return Err(err);
        }

        let receipt = build_receipt(&catalog, &items);
        info!(
            event = %receipt.event,
            receipt = %receipt.id,
            quantity = receipt.total_quantity,
            total = %receipt.total_price,
            "commit succeeded"
        );

        self.session.clear();
        self.terms_accepted = false;
        attempt.finish(CheckoutState::Committed);
        self.transition(CheckoutState::Idle);

        Ok(receipt)
    }
}

/// Private API
impl Checkout {
    fn terms_satisfied(&self) -> bool {
        !self.require_terms || self.terms_accepted
    }

    fn refresh_state(&mut self) {
        let next = if self.can_commit() {
            CheckoutState::ReadyToCommit
        } else {
            CheckoutState::Selecting
        };
        self.transition(next);
    }

    fn transition(&mut self, next: CheckoutState) {
        set_state(&mut self.state, next);
    }
}

fn set_state(state: &mut CheckoutState, next: CheckoutState) {
    if *state != next {
        debug!(from = %state, to = %next, "checkout transition");
        *state = next;
    }
}

/// Holds a checkout in `Committing` until `finish`. If the commit future is
/// dropped first, the state goes back to where it was.
struct CommitAttempt<'a> {
    state: &'a mut CheckoutState,
    previous: CheckoutState,
    finished: bool,
}

impl<'a> CommitAttempt<'a> {
    fn begin(state: &'a mut CheckoutState) -> Self {
        let previous = *state;
        set_state(state, CheckoutState::Committing);
        Self {
            state,
            previous,
            finished: false,
        }
    }

    fn finish(mut self, next: CheckoutState) {
        set_state(self.state, next);
        self.finished = true;
    }
}

impl Drop for CommitAttempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(restored = %self.previous, "commit abandoned");
            set_state(self.state, self.previous);
        }
    }
}

fn build_receipt(catalog: &InventoryCatalog, items: &[(TierId, u32)]) -> Receipt {
    let lines: Vec<ReceiptLine> = items
        .iter()
        .filter_map(|(tier, quantity)| {
            let snapshot = catalog.get_tier(tier)?;
            Some(ReceiptLine {
                tier_id: snapshot.id,
                name: snapshot.name,
                quantity: *quantity,
                unit_price: snapshot.unit_price,
                subtotal: snapshot.unit_price.times(*quantity),
            })
        })
        .collect();

    Receipt {
        id: Uuid::new_v4(),
        event: catalog.event().clone(),
        total_quantity: lines
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.quantity)),
        total_price: lines.iter().map(|line| line.subtotal).sum::<Amount>(),
        lines,
        committed_at: Utc::now(),
    }
}
