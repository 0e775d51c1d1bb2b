//! Inventory domain module.
//!
//! This crate contains the business rules for stock quantities and FIFO
//! costing, implemented purely as deterministic domain logic (no IO, no
//! storage). The infra crate composes these types inside transactions.

pub mod layer;
pub mod record;
pub mod transaction;

pub use layer::{
    apply_plan, plan_consumption, weighted_average_cost, ConsumptionPlan, CostLayer, CostLayerId,
    LayerConsumption,
};
pub use record::{InventoryRecord, RecordFilter};
pub use transaction::{
    InventoryTransaction, LotInfo, ReferenceDocument, TransactionDraft, TransactionFilter,
    TransactionKind,
};
