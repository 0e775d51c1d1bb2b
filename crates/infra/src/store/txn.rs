//! Transaction scope: staged working copies plus held row locks.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use stockforge_core::{StockError, StockKey, StockResult};
use stockforge_inventory::{CostLayer, InventoryRecord, InventoryTransaction};

use crate::locks::TxnId;
use crate::pool::PoolPermit;
use crate::store::db::InventoryDb;
use crate::store::journal::TransactionLog;
use crate::store::layers::CostLedger;
use crate::store::records::RecordStore;

/// Working copy of one key's state inside a transaction.
#[derive(Debug, Default, Clone)]
pub(crate) struct KeyWorkspace {
    pub(crate) record: Option<InventoryRecord>,
    pub(crate) layers: Vec<CostLayer>,
}

/// One open database transaction.
///
/// All reads and writes inside the transaction operate on working copies;
/// nothing is visible to other callers until [`StockTxn::commit`]. Dropping
/// an uncommitted transaction (explicit rollback, error paths, abandoned
/// callers) releases its locks and pool slot with zero partial writes.
#[derive(Debug)]
pub struct StockTxn {
    db: Arc<InventoryDb>,
    txn_id: TxnId,
    _permit: PoolPermit,
    workspaces: HashMap<StockKey, KeyWorkspace>,
    journal: Vec<InventoryTransaction>,
}

impl StockTxn {
    pub(crate) fn new(db: Arc<InventoryDb>, permit: PoolPermit, txn_id: TxnId) -> Self {
        Self {
            db,
            txn_id,
            _permit: permit,
            workspaces: HashMap::new(),
            journal: Vec::new(),
        }
    }

    /// Component views over this transaction.
    pub fn records(&mut self) -> RecordStore<'_> {
        RecordStore::new(self)
    }

    pub fn cost_ledger(&mut self) -> CostLedger<'_> {
        CostLedger::new(self)
    }

    pub fn log(&mut self) -> TransactionLog<'_> {
        TransactionLog::new(self)
    }

    /// Acquire row locks for several keys up front, in ascending key order.
    ///
    /// Transfers use this so that opposite-direction transfers over the same
    /// pair of keys always lock in the same order.
    pub fn lock_keys(&mut self, keys: &[StockKey]) -> StockResult<()> {
        let mut sorted = keys.to_vec();
        sorted.sort();
        sorted.dedup();
        for key in sorted {
            self.ensure_loaded(&key)?;
        }
        Ok(())
    }

    /// Load a key's committed state into the working set, taking its row
    /// lock first. Subsequent touches of the key are lock-free.
    pub(crate) fn ensure_loaded(&mut self, key: &StockKey) -> StockResult<&mut KeyWorkspace> {
        if !self.workspaces.contains_key(key) {
            self.db
                .locks()
                .acquire(*key, self.txn_id, self.db.config().lock_timeout)?;
            let workspace = self.db.load_workspace(key)?;
            self.workspaces.insert(*key, workspace);
        }
        self.workspaces
            .get_mut(key)
            .ok_or_else(|| StockError::persistence("workspace vanished after load"))
    }

    pub(crate) fn db(&self) -> &InventoryDb {
        &self.db
    }

    pub(crate) fn stage_journal(&mut self, entry: InventoryTransaction) {
        self.journal.push(entry);
    }

    /// Publish all staged writes atomically, then release locks.
    pub fn commit(mut self) -> StockResult<()> {
        let workspaces = mem::take(&mut self.workspaces);
        let journal = mem::take(&mut self.journal);
        self.db.commit_staged(workspaces, journal)
        // Drop releases row locks and the pool permit.
    }

    /// Discard all staged writes. Equivalent to dropping the transaction.
    pub fn rollback(self) {}
}

impl Drop for StockTxn {
    fn drop(&mut self) {
        self.db.locks().release_all(self.txn_id);
    }
}
