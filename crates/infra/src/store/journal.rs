//! TransactionLog: append-only journal writes inside a transaction.

use chrono::{DateTime, Utc};

use stockforge_core::{StockResult, TransactionId};
use stockforge_inventory::{InventoryTransaction, TransactionDraft};

use crate::store::txn::StockTxn;

/// Transactional view over the movement journal.
///
/// `append` assigns the id and timestamp and stages the entry; committed
/// entries are write-once and never updated. Queries over committed entries
/// live on [`crate::store::InventoryDb::transactions`] — they are read-only
/// and off the correctness-critical path.
pub struct TransactionLog<'a> {
    txn: &'a mut StockTxn,
}

impl<'a> TransactionLog<'a> {
    pub(crate) fn new(txn: &'a mut StockTxn) -> Self {
        Self { txn }
    }

    /// Journal one movement, assigning its id (UUIDv7) and timestamp.
    pub fn append(
        &mut self,
        draft: TransactionDraft,
        now: DateTime<Utc>,
    ) -> StockResult<InventoryTransaction> {
        draft.validate()?;
        let entry = InventoryTransaction::from_draft(draft, TransactionId::new(), now);
        self.txn.stage_journal(entry.clone());
        Ok(entry)
    }
}
