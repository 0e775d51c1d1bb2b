//! InventoryRecordStore: quantity state operations inside a transaction.

use chrono::{DateTime, Utc};

use stockforge_core::{StockError, StockKey, StockResult};
use stockforge_inventory::InventoryRecord;

use crate::store::txn::StockTxn;

/// Transactional view over inventory records.
///
/// Every operation loads (and row-locks) the key on first touch and then
/// works against the transaction's staged copy. Returned records are
/// snapshots of the staged state.
pub struct RecordStore<'a> {
    txn: &'a mut StockTxn,
}

impl<'a> RecordStore<'a> {
    pub(crate) fn new(txn: &'a mut StockTxn) -> Self {
        Self { txn }
    }

    /// Staged record at the key, if one exists.
    pub fn get(&mut self, key: &StockKey) -> StockResult<Option<InventoryRecord>> {
        Ok(self.txn.ensure_loaded(key)?.record.clone())
    }

    /// Load the record, creating a zero-quantity one on first movement.
    pub fn get_or_create(
        &mut self,
        key: &StockKey,
        now: DateTime<Utc>,
    ) -> StockResult<InventoryRecord> {
        let workspace = self.txn.ensure_loaded(key)?;
        Ok(workspace
            .record
            .get_or_insert_with(|| InventoryRecord::new(*key, now))
            .clone())
    }

    /// Apply an on-hand/reserved delta, creating the record if absent.
    pub fn apply_movement(
        &mut self,
        key: &StockKey,
        on_hand_delta: i64,
        reserved_delta: i64,
        now: DateTime<Utc>,
    ) -> StockResult<InventoryRecord> {
        let workspace = self.txn.ensure_loaded(key)?;
        let record = workspace
            .record
            .get_or_insert_with(|| InventoryRecord::new(*key, now));
        record.apply_movement(on_hand_delta, reserved_delta, now)?;
        Ok(record.clone())
    }

    pub fn reserve(
        &mut self,
        key: &StockKey,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StockResult<InventoryRecord> {
        let workspace = self.txn.ensure_loaded(key)?;
        let record = workspace
            .record
            .get_or_insert_with(|| InventoryRecord::new(*key, now));
        record.reserve(quantity, now)?;
        Ok(record.clone())
    }

    pub fn unreserve(
        &mut self,
        key: &StockKey,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StockResult<InventoryRecord> {
        let workspace = self.txn.ensure_loaded(key)?;
        let record = workspace
            .record
            .get_or_insert_with(|| InventoryRecord::new(*key, now));
        record.unreserve(quantity, now)?;
        Ok(record.clone())
    }

    /// Soft delete an empty position.
    pub fn retire(&mut self, key: &StockKey, now: DateTime<Utc>) -> StockResult<InventoryRecord> {
        let workspace = self.txn.ensure_loaded(key)?;
        let record = workspace
            .record
            .as_mut()
            .ok_or_else(|| StockError::not_found(format!("no inventory record at {key}")))?;
        record.retire(now)?;
        Ok(record.clone())
    }

    pub fn set_reorder_levels(
        &mut self,
        key: &StockKey,
        reorder_point: Option<i64>,
        reorder_quantity: Option<i64>,
        now: DateTime<Utc>,
    ) -> StockResult<InventoryRecord> {
        let workspace = self.txn.ensure_loaded(key)?;
        let record = workspace
            .record
            .get_or_insert_with(|| InventoryRecord::new(*key, now));
        record.set_reorder_levels(reorder_point, reorder_quantity, now)?;
        Ok(record.clone())
    }
}
