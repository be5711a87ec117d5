// Durable trade history
pub mod ledger;
pub mod store;
pub mod summary;

pub use ledger::TradeLedger;
pub use store::{JsonFileStore, LedgerStore};
pub use summary::LedgerSummary;
