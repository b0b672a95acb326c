pub mod ledger;
pub mod purchases;

pub use ledger::{EconomyLedger, EntryKind, LedgerReceipt, LedgerTotals};
pub use purchases::{Benefit, Purchase, CATALOG};
