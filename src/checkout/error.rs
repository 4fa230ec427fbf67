use std::time::Duration;

use thiserror::Error;

use crate::catalog::{InsufficientInventory, ReserveError};
use crate::model::TierId;

/// Error returned by [`Checkout::commit`](super::Checkout::commit).
///
/// Whatever the variant, a failed commit has left the catalog unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("nothing selected")]
    EmptySelection,

    #[error("terms of sale not accepted")]
    TermsNotAccepted,

    #[error(transparent)]
    InsufficientInventory(InsufficientInventory),

    #[error("commit rolled back, tier {failed_tier} conflicted: {source}")]
    PartialInventoryConflict {
        failed_tier: TierId,
        source: InsufficientInventory,
    },

    #[error("tier {0} is no longer offered")]
    UnknownTier(TierId),

    #[error("commit timed out after {0:?}")]
    Timeout(Duration),
}

impl CommitError {
    /// Classify a catalog failure for a commit spanning `tiers` distinct tiers.
    pub(crate) fn from_reserve(err: ReserveError, tiers: usize) -> Self {
        match err {
            ReserveError::Insufficient(source) if tiers > 1 => {
                CommitError::PartialInventoryConflict {
                    failed_tier: source.tier.clone(),
                    source,
                }
            }
            ReserveError::Insufficient(source) => CommitError::InsufficientInventory(source),
            ReserveError::UnknownTier(tier) => CommitError::UnknownTier(tier),
            ReserveError::Timeout(after) => CommitError::Timeout(after),
        }
    }

    /// Whether the buyer can retry, possibly after adjusting quantities.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommitError::InsufficientInventory(_)
                | CommitError::PartialInventoryConflict { .. }
                | CommitError::Timeout(_)
        )
    }
}
