//! Shared committed state and transaction entry point.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use stockforge_core::{ProductId, StockError, StockKey, StockResult, TransactionId};
use stockforge_inventory::{
    CostLayer, CostLayerId, InventoryRecord, InventoryTransaction, RecordFilter, TransactionFilter,
};

use crate::config::EngineConfig;
use crate::locks::LockTable;
use crate::pool::ConnectionPool;
use crate::store::txn::{KeyWorkspace, StockTxn};

/// Committed ledger state. Only ever mutated by [`InventoryDb::commit_staged`],
/// with every touched key's row lock held by the committing transaction.
#[derive(Debug, Default)]
struct DbState {
    records: BTreeMap<StockKey, InventoryRecord>,
    layers: BTreeMap<StockKey, Vec<CostLayer>>,
    journal: Vec<InventoryTransaction>,
    journal_ids: HashSet<TransactionId>,
}

/// The storage engine behind the ledger.
///
/// Mutations go through transactions ([`InventoryDb::begin`]) which stage
/// working copies and publish them atomically at commit. Reads outside a
/// transaction observe the latest committed snapshot.
#[derive(Debug)]
pub struct InventoryDb {
    state: Mutex<DbState>,
    locks: LockTable,
    pool: ConnectionPool,
    config: EngineConfig,
    txn_seq: AtomicU64,
    layer_seq: AtomicU64,
}

impl InventoryDb {
    pub fn new(config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DbState::default()),
            locks: LockTable::new(),
            pool: ConnectionPool::new(config.max_connections),
            config,
            txn_seq: AtomicU64::new(0),
            layer_seq: AtomicU64::new(0),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a transaction, blocking up to `acquire_timeout` for a pool slot.
    pub fn begin(self: &Arc<Self>) -> StockResult<StockTxn> {
        let permit = self.pool.acquire(self.config.acquire_timeout)?;
        let txn_id = self.txn_seq.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(StockTxn::new(Arc::clone(self), permit, txn_id))
    }

    fn state(&self) -> StockResult<MutexGuard<'_, DbState>> {
        self.state
            .lock()
            .map_err(|_| StockError::persistence("engine state lock poisoned"))
    }

    // ── committed-state reads ────────────────────────────────────────────

    pub fn record(&self, key: &StockKey) -> StockResult<Option<InventoryRecord>> {
        Ok(self.state()?.records.get(key).cloned())
    }

    pub fn records(&self, filter: &RecordFilter) -> StockResult<Vec<InventoryRecord>> {
        Ok(self
            .state()?
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    pub fn records_for_product(&self, product_id: ProductId) -> StockResult<Vec<InventoryRecord>> {
        self.records(&RecordFilter {
            product_id: Some(product_id),
            ..RecordFilter::default()
        })
    }

    /// Active records whose available quantity sits at or under their
    /// reorder point.
    pub fn records_below_reorder(&self) -> StockResult<Vec<InventoryRecord>> {
        Ok(self
            .state()?
            .records
            .values()
            .filter(|r| r.needs_reorder())
            .cloned()
            .collect())
    }

    /// Open (remaining > 0) layers at a key, FIFO order.
    pub fn open_layers(&self, key: &StockKey) -> StockResult<Vec<CostLayer>> {
        let state = self.state()?;
        let mut open: Vec<CostLayer> = state
            .layers
            .get(key)
            .into_iter()
            .flatten()
            .filter(|l| l.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|l| (l.received_at(), l.id()));
        Ok(open)
    }

    pub fn transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StockResult<Vec<InventoryTransaction>> {
        Ok(self
            .state()?
            .journal
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    // ── transaction support ──────────────────────────────────────────────

    pub(crate) fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub(crate) fn next_layer_id(&self) -> CostLayerId {
        CostLayerId(self.layer_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Clone the committed record + layers for a key into a transaction's
    /// working set. The caller must already hold the key's row lock.
    pub(crate) fn load_workspace(&self, key: &StockKey) -> StockResult<KeyWorkspace> {
        let state = self.state()?;
        Ok(KeyWorkspace {
            record: state.records.get(key).cloned(),
            layers: state.layers.get(key).cloned().unwrap_or_default(),
        })
    }

    /// Publish a transaction's staged writes as one unit.
    ///
    /// The committing transaction still holds every touched key's row lock,
    /// so replacing whole per-key states cannot clobber concurrent work.
    pub(crate) fn commit_staged(
        &self,
        workspaces: impl IntoIterator<Item = (StockKey, KeyWorkspace)>,
        journal: Vec<InventoryTransaction>,
    ) -> StockResult<()> {
        let mut state = self.state()?;

        for entry in &journal {
            if state.journal_ids.contains(&entry.id) {
                return Err(StockError::persistence(format!(
                    "journal id {} already committed",
                    entry.id
                )));
            }
        }

        for (key, workspace) in workspaces {
            if let Some(record) = workspace.record {
                state.records.insert(key, record);
            }
            state.layers.insert(key, workspace.layers);
        }
        for entry in journal {
            state.journal_ids.insert(entry.id);
            state.journal.push(entry);
        }

        Ok(())
    }
}
