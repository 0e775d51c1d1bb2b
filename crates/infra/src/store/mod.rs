//! Storage engine: shared committed state, transactions, and the three
//! component views (records, cost layers, journal).

pub mod db;
pub mod journal;
pub mod layers;
pub mod records;
pub mod txn;

pub use db::InventoryDb;
pub use journal::TransactionLog;
pub use layers::CostLedger;
pub use records::RecordStore;
pub use txn::StockTxn;
