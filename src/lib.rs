pub mod amount;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod csv;
pub mod engine;
pub mod model;
pub mod session;

pub use amount::Amount;
pub use catalog::InventoryCatalog;
pub use checkout::{Checkout, CheckoutState, CommitError, can_commit, summarize};
pub use config::Config;
pub use engine::Engine;
pub use model::{
    Action, BuyerId, CheckoutSummary, EventId, Receipt, ReceiptId, ReceiptLine, SelectionEntry,
    TicketTier, TierId, TierRecord,
};
pub use session::SelectionSession;
