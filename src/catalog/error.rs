//! Error types for catalog loading and reservation.

use std::time::Duration;

use thiserror::Error;

use crate::Amount;
use crate::model::{EventId, TierId};

/// Error building or loading a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("event {0} not found")]
    NotFound(EventId),

    #[error("duplicate tier id {0}")]
    DuplicateTier(TierId),

    #[error("tier {0} has negative price {1}")]
    NegativePrice(TierId, Amount),
}

/// A tier could not cover the requested quantity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("insufficient inventory for tier {tier}: remaining {remaining}, requested {requested}")]
pub struct InsufficientInventory {
    pub tier: TierId,
    pub remaining: u32,
    pub requested: u32,
}

/// Error during a reservation or release against the catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReserveError {
    #[error(transparent)]
    Insufficient(#[from] InsufficientInventory),

    #[error("tier {0} is not part of this catalog")]
    UnknownTier(TierId),

    #[error("inventory lock not acquired within {0:?}")]
    Timeout(Duration),
}

impl ReserveError {
    /// Whether retrying (possibly after adjusting quantities) can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ReserveError::UnknownTier(_))
    }
}
