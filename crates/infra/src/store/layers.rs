//! CostLayerLedger: FIFO cost layer operations inside a transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockforge_core::{StockKey, StockResult, TransactionId};
use stockforge_inventory::{
    apply_plan, plan_consumption, weighted_average_cost, ConsumptionPlan, CostLayer,
};

use crate::store::txn::StockTxn;

/// Transactional view over cost layers.
pub struct CostLedger<'a> {
    txn: &'a mut StockTxn,
}

impl<'a> CostLedger<'a> {
    pub(crate) fn new(txn: &'a mut StockTxn) -> Self {
        Self { txn }
    }

    /// Open a new priced batch at the key.
    ///
    /// `source_transaction` is the receipt / adjustment-in / transfer-in
    /// journal entry the layer traces back to.
    pub fn open_layer(
        &mut self,
        source_transaction: TransactionId,
        key: &StockKey,
        quantity: i64,
        unit_cost: Decimal,
        received_at: DateTime<Utc>,
    ) -> StockResult<CostLayer> {
        // Lock the key before allocating the id so ids at one key stay
        // monotone in commit order.
        self.txn.ensure_loaded(key)?;
        let id = self.txn.db().next_layer_id();
        let layer = CostLayer::new(id, *key, source_transaction, quantity, unit_cost, received_at)?;
        self.txn.ensure_loaded(key)?.layers.push(layer.clone());
        Ok(layer)
    }

    /// Deplete open layers FIFO until `quantity` is covered.
    ///
    /// Fails fast with `InsufficientStock` before any layer is touched; on
    /// success returns the consumed parts and the realized weighted cost.
    pub fn consume(&mut self, key: &StockKey, quantity: i64) -> StockResult<ConsumptionPlan> {
        let workspace = self.txn.ensure_loaded(key)?;
        let plan = plan_consumption(&workspace.layers, quantity)?;
        apply_plan(&mut workspace.layers, &plan)?;
        Ok(plan)
    }

    /// Weighted average unit cost over the key's open layers.
    pub fn average_cost(&mut self, key: &StockKey) -> StockResult<Option<Decimal>> {
        let workspace = self.txn.ensure_loaded(key)?;
        Ok(weighted_average_cost(&workspace.layers))
    }

    /// Open layers at the key in FIFO order.
    pub fn open_layers(&mut self, key: &StockKey) -> StockResult<Vec<CostLayer>> {
        let workspace = self.txn.ensure_loaded(key)?;
        let mut open: Vec<CostLayer> = workspace
            .layers
            .iter()
            .filter(|l| l.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|l| (l.received_at(), l.id()));
        Ok(open)
    }
}
