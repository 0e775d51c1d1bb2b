//! Per-key row locks scoped to one transaction.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use stockforge_core::{StockError, StockKey, StockResult};

/// Transaction identifier inside the engine (not journaled).
pub(crate) type TxnId = u64;

/// Exclusive locks over stock keys.
///
/// A transaction acquires a key's lock on first read of that key and keeps
/// it until commit or rollback; acquisition is reentrant for the holder.
/// Waiting is bounded — a timeout surfaces as `ConcurrentModification`,
/// which the coordinator treats as retryable.
#[derive(Debug, Default)]
pub struct LockTable {
    holders: Mutex<HashMap<StockKey, TxnId>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquire(
        &self,
        key: StockKey,
        owner: TxnId,
        timeout: Duration,
    ) -> StockResult<()> {
        let deadline = Instant::now() + timeout;
        let mut holders = self
            .holders
            .lock()
            .map_err(|_| StockError::persistence("lock table poisoned"))?;

        loop {
            match holders.get(&key).copied() {
                None => {
                    holders.insert(key, owner);
                    return Ok(());
                }
                Some(holder) if holder == owner => return Ok(()),
                Some(_) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(StockError::concurrent(format!(
                            "timed out waiting for row lock on {key}"
                        )));
                    }
                    let (guard, wait) = self
                        .released
                        .wait_timeout(holders, deadline - now)
                        .map_err(|_| StockError::persistence("lock table poisoned"))?;
                    holders = guard;
                    if wait.timed_out() && holders.get(&key).is_some_and(|h| *h != owner) {
                        return Err(StockError::concurrent(format!(
                            "timed out waiting for row lock on {key}"
                        )));
                    }
                }
            }
        }
    }

    /// Release every lock held by `owner` and wake waiters.
    pub(crate) fn release_all(&self, owner: TxnId) {
        if let Ok(mut holders) = self.holders.lock() {
            holders.retain(|_, holder| *holder != owner);
            self.released.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stockforge_core::{LocationId, ProductId, WarehouseId};
    use uuid::Uuid;

    fn key(n: u128) -> StockKey {
        StockKey::new(
            ProductId::from_uuid(Uuid::from_u128(n)),
            WarehouseId::from_uuid(Uuid::from_u128(n)),
            LocationId::from_uuid(Uuid::from_u128(n)),
        )
    }

    #[test]
    fn lock_is_exclusive_between_owners() {
        let table = LockTable::new();
        table.acquire(key(1), 1, Duration::from_millis(10)).unwrap();

        let err = table
            .acquire(key(1), 2, Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, StockError::ConcurrentModification(_)));
    }

    #[test]
    fn lock_is_reentrant_for_the_holder() {
        let table = LockTable::new();
        table.acquire(key(1), 1, Duration::from_millis(10)).unwrap();
        table.acquire(key(1), 1, Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn disjoint_keys_do_not_contend() {
        let table = LockTable::new();
        table.acquire(key(1), 1, Duration::from_millis(10)).unwrap();
        table.acquire(key(2), 2, Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn release_wakes_blocked_acquirer() {
        let table = Arc::new(LockTable::new());
        table.acquire(key(1), 1, Duration::from_millis(10)).unwrap();

        let waiter = {
            let table = Arc::clone(&table);
            std::thread::spawn(move || table.acquire(key(1), 2, Duration::from_secs(2)))
        };

        std::thread::sleep(Duration::from_millis(50));
        table.release_all(1);

        assert!(waiter.join().unwrap().is_ok());
    }
}
