//! Bounded connection pool gating concurrent transactions.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use stockforge_core::{StockError, StockResult};

/// Fixed-capacity permit pool.
///
/// Every transaction holds one permit for its whole lifetime; acquisition
/// blocks up to the caller's timeout and then fails with `PoolExhausted`.
/// Permits return to the pool when dropped.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

impl ConnectionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity,
                available: Mutex::new(capacity),
                released: Condvar::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Take a permit, waiting up to `timeout` for one to free up.
    pub fn acquire(&self, timeout: Duration) -> StockResult<PoolPermit> {
        let deadline = Instant::now() + timeout;
        let mut available = self
            .inner
            .available
            .lock()
            .map_err(|_| StockError::persistence("connection pool lock poisoned"))?;

        loop {
            if *available > 0 {
                *available -= 1;
                return Ok(PoolPermit {
                    inner: Arc::clone(&self.inner),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(StockError::PoolExhausted);
            }

            let (guard, wait) = self
                .inner
                .released
                .wait_timeout(available, deadline - now)
                .map_err(|_| StockError::persistence("connection pool lock poisoned"))?;
            available = guard;

            if wait.timed_out() && *available == 0 {
                return Err(StockError::PoolExhausted);
            }
        }
    }
}

/// RAII handle for one pooled transaction slot.
#[derive(Debug)]
pub struct PoolPermit {
    inner: Arc<PoolInner>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        if let Ok(mut available) = self.inner.available.lock() {
            *available += 1;
            self.inner.released.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_round_trip() {
        let pool = ConnectionPool::new(2);

        let a = pool.acquire(Duration::from_millis(10)).unwrap();
        let _b = pool.acquire(Duration::from_millis(10)).unwrap();

        let err = pool.acquire(Duration::from_millis(20)).unwrap_err();
        assert_eq!(err, StockError::PoolExhausted);

        drop(a);
        pool.acquire(Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn dropped_permit_wakes_a_waiter() {
        let pool = ConnectionPool::new(1);
        let permit = pool.acquire(Duration::from_millis(10)).unwrap();

        let waiter = {
            let pool = pool.clone();
            std::thread::spawn(move || pool.acquire(Duration::from_secs(2)))
        };

        std::thread::sleep(Duration::from_millis(50));
        drop(permit);

        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn zero_capacity_pool_always_exhausts() {
        let pool = ConnectionPool::new(0);
        let err = pool.acquire(Duration::from_millis(5)).unwrap_err();
        assert_eq!(err, StockError::PoolExhausted);
    }
}
