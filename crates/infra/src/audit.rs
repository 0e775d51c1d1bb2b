//! Best-effort audit trail hook.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockforge_core::UserId;

/// One audited mutation, recorded after a successful commit.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: UserId,
    /// Action type, e.g. "inventory.receipt".
    pub action: String,
    /// The entity acted on (stock key, rendered).
    pub entity: String,
    pub before: JsonValue,
    pub after: JsonValue,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit sink failure: {0}")]
pub struct AuditError(pub String);

/// Sink for audit entries.
///
/// Invoked after the business transaction has committed; a failure here is
/// logged and never rolls back the committed work (best-effort,
/// fire-and-forget).
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry)
    }
}

/// Collects entries in memory. Tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .map_err(|_| AuditError("audit store poisoned".to_string()))?
            .push(entry);
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _entry: AuditEntry) -> Result<(), AuditError> {
        Ok(())
    }
}
