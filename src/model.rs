//! Core domain types for ticket selection and checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;

/// Event identifier, as handed out by the event data source.
pub type EventId = String;

/// Ticket tier identifier, unique within one event.
pub type TierId = String;

/// Buyer identifier.
pub type BuyerId = u32;

/// Receipt identifier.
pub type ReceiptId = Uuid;

/// A tier row as supplied by the event data source, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRecord {
    pub id: TierId,
    pub name: String,
    pub unit_price: Amount,
    pub remaining: u32,
}

impl TierRecord {
    pub fn new(
        id: impl Into<TierId>,
        name: impl Into<String>,
        unit_price: Amount,
        remaining: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            remaining,
        }
    }
}

/// Point-in-time view of one tier of a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketTier {
    pub id: TierId,
    pub name: String,
    pub unit_price: Amount,
    pub remaining: u32,
}

/// Units of one tier chosen by a buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionEntry {
    pub tier_id: TierId,
    pub quantity: u32,
}

/// Totals derived from a selection. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CheckoutSummary {
    pub total_quantity: u32,
    pub total_price: Amount,
}

impl CheckoutSummary {
    pub fn is_empty(&self) -> bool {
        self.total_quantity == 0
    }
}

/// One committed tier line of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub tier_id: TierId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Amount,
    pub subtotal: Amount,
}

/// Proof of a successful commit, handed to the payment/confirmation workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub event: EventId,
    pub lines: Vec<ReceiptLine>,
    pub total_quantity: u32,
    pub total_price: Amount,
    pub committed_at: DateTime<Utc>,
}

/// A buyer interaction with the box office.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Choose an exact quantity of a tier (clamped to availability).
    Set {
        buyer: BuyerId,
        event: EventId,
        tier: TierId,
        quantity: u32,
    },
    /// Add one unit of a tier.
    Increment {
        buyer: BuyerId,
        event: EventId,
        tier: TierId,
    },
    /// Remove one unit of a tier.
    Decrement {
        buyer: BuyerId,
        event: EventId,
        tier: TierId,
    },
    /// Agree to the terms of sale.
    AcceptTerms { buyer: BuyerId, event: EventId },
    /// Reserve the current selection.
    Commit { buyer: BuyerId, event: EventId },
    /// Abandon the checkout.
    Cancel { buyer: BuyerId, event: EventId },
}

impl Action {
    pub fn buyer(&self) -> BuyerId {
        match self {
            Action::Set { buyer, .. }
            | Action::Increment { buyer, .. }
            | Action::Decrement { buyer, .. }
            | Action::AcceptTerms { buyer, .. }
            | Action::Commit { buyer, .. }
            | Action::Cancel { buyer, .. } => *buyer,
        }
    }

    pub fn event(&self) -> &EventId {
        match self {
            Action::Set { event, .. }
            | Action::Increment { event, .. }
            | Action::Decrement { event, .. }
            | Action::AcceptTerms { event, .. }
            | Action::Commit { event, .. }
            | Action::Cancel { event, .. } => event,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Set { .. } => "set",
            Action::Increment { .. } => "increment",
            Action::Decrement { .. } => "decrement",
            Action::AcceptTerms { .. } => "accept",
            Action::Commit { .. } => "commit",
            Action::Cancel { .. } => "cancel",
        }
    }
}
