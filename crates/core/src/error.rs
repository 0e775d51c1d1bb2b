//! Error model shared by every stock operation.

use thiserror::Error;

/// Result type used across the stock core.
pub type StockResult<T> = Result<T, StockError>;

/// Failure taxonomy for the quantity-and-costing ledger.
///
/// Business failures (`Validation`, `InvalidState`, `NotFound`,
/// `InsufficientStock`, `PermissionDenied`) are surfaced to the caller with
/// no mutation performed. `ConcurrentModification` is the only retryable
/// class; `PoolExhausted` and `Persistence` are fatal to the current call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// Malformed input, rejected before any state is touched.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested mutation would leave a record in an illegal state
    /// (negative on-hand, reserved above on-hand, retiring live stock).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A referenced entity or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An issue/reserve/transfer-out asked for more than is available.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// The acting user lacks the required permission.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A row-lock conflict with a concurrent transaction.
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    /// No transaction slot became available within the acquisition timeout.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Storage-level failure (poisoned lock, broken backend). Always fatal
    /// to the current call.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn insufficient(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn concurrent(msg: impl Into<String>) -> Self {
        Self::ConcurrentModification(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Whether a fresh attempt against current state may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }

    /// Infrastructure failures that must be logged at error severity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PoolExhausted | Self::Persistence(_))
    }
}
