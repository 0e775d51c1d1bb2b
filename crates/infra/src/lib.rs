//! Storage engine and orchestration for the stock ledger.
//!
//! The [`coordinator::TransactionCoordinator`] is the public surface; it
//! composes the record store, cost-layer ledger, and movement journal inside
//! pooled, row-locked transactions and consumes the injected permission,
//! audit, and catalog collaborators.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod locks;
pub mod pool;
pub mod store;
pub mod telemetry;


pub use audit::{AuditEntry, AuditError, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use catalog::{Catalog, OpenCatalog, StaticCatalog};
pub use config::EngineConfig;
pub use coordinator::{
    AdjustmentDirection, GoodsIssue, GoodsReceipt, StockAdjustment, StockTransfer,
    TransactionCoordinator, TransferOutcome,
};
pub use locks::LockTable;
pub use pool::{ConnectionPool, PoolPermit};
pub use store::{CostLedger, InventoryDb, RecordStore, StockTxn, TransactionLog};
