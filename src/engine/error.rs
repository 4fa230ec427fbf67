//! Error types for buyer action processing.

use thiserror::Error;

use crate::catalog::{LoadError, ReserveError};
use crate::checkout::CommitError;
use crate::model::{BuyerId, EventId, ReceiptId, TierId};

/// Top-level error returned by [`Engine::apply`](super::Engine::apply).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("catalog unavailable: {0}")]
    Load(#[from] LoadError),

    #[error("commit failed: {0}")]
    Commit(#[from] CommitError),

    #[error("refund failed: {0}")]
    Refund(#[from] ReserveError),

    #[error("event {0}: unknown tier {1}")]
    UnknownTier(EventId, TierId),

    #[error("buyer {0} has no open checkout for event {1}")]
    NoCheckout(BuyerId, EventId),

    #[error("receipt {0} not found")]
    UnknownReceipt(ReceiptId),
}
