//! Immutable journal events for every stock movement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockforge_core::{
    DocumentId, LocationId, ProductId, StockError, StockKey, StockResult, TransactionId,
    WarehouseId,
};

/// Movement classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Receipt,
    Issue,
    AdjustmentIn,
    AdjustmentOut,
    TransferOut,
    TransferIn,
    Reservation,
    Unreservation,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Receipt => "receipt",
            TransactionKind::Issue => "issue",
            TransactionKind::AdjustmentIn => "adjustment_in",
            TransactionKind::AdjustmentOut => "adjustment_out",
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::TransferIn => "transfer_in",
            TransactionKind::Reservation => "reservation",
            TransactionKind::Unreservation => "unreservation",
        }
    }

    /// Kinds that add on-hand stock (and open a cost layer).
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            TransactionKind::Receipt | TransactionKind::AdjustmentIn | TransactionKind::TransferIn
        )
    }

    /// Kinds that remove on-hand stock (and consume cost layers).
    pub fn is_outbound(&self) -> bool {
        matches!(
            self,
            TransactionKind::Issue | TransactionKind::AdjustmentOut | TransactionKind::TransferOut
        )
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer to the external document that caused a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub document_id: DocumentId,
    /// Free-form document kind, e.g. "sales_order" or "stocktake". Document
    /// lifecycles live outside this core.
    pub document_kind: String,
}

impl ReferenceDocument {
    pub fn new(document_id: DocumentId, document_kind: impl Into<String>) -> Self {
        Self {
            document_id,
            document_kind: document_kind.into(),
        }
    }
}

/// Optional lot/serial traceability carried on a movement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotInfo {
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A not-yet-journaled movement. The log assigns id and timestamp on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub key: StockKey,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    pub lot: Option<LotInfo>,
    pub reference: Option<ReferenceDocument>,
}

impl TransactionDraft {
    pub fn new(key: StockKey, kind: TransactionKind, quantity: i64) -> Self {
        Self {
            key,
            kind,
            quantity,
            unit_cost: None,
            lot: None,
            reference: None,
        }
    }

    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    pub fn with_lot(mut self, lot: LotInfo) -> Self {
        self.lot = Some(lot);
        self
    }

    pub fn with_reference(mut self, reference: ReferenceDocument) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn validate(&self) -> StockResult<()> {
        if self.quantity <= 0 {
            return Err(StockError::validation(
                "transaction quantity must be positive",
            ));
        }
        if self.unit_cost.is_some_and(|c| c < Decimal::ZERO) {
            return Err(StockError::validation("unit cost cannot be negative"));
        }
        // Stock-moving kinds price the movement; reservations never do.
        if (self.kind.is_inbound() || self.kind.is_outbound()) && self.unit_cost.is_none() {
            return Err(StockError::validation(format!(
                "{} transactions must carry a unit cost",
                self.kind
            )));
        }
        Ok(())
    }
}

/// One journaled stock movement. Created exactly once, never updated; the
/// journal is for audit and reporting, not for recomputing current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: TransactionId,
    pub key: StockKey,
    pub kind: TransactionKind,
    pub quantity: i64,
    /// Realized weighted cost for outbound kinds, booked cost for inbound
    /// kinds, absent for reservations.
    pub unit_cost: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
    pub lot: Option<LotInfo>,
    pub reference: Option<ReferenceDocument>,
}

impl InventoryTransaction {
    pub fn from_draft(draft: TransactionDraft, id: TransactionId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id,
            key: draft.key,
            kind: draft.kind,
            quantity: draft.quantity,
            unit_cost: draft.unit_cost,
            occurred_at,
            lot: draft.lot,
            reference: draft.reference,
        }
    }
}

/// Read-side filter over the journal.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
    pub location_id: Option<LocationId>,
    pub kind: Option<TransactionKind>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, txn: &InventoryTransaction) -> bool {
        self.product_id.is_none_or(|p| p == txn.key.product_id)
            && self.warehouse_id.is_none_or(|w| w == txn.key.warehouse_id)
            && self.location_id.is_none_or(|l| l == txn.key.location_id)
            && self.kind.is_none_or(|k| k == txn.kind)
            && self.occurred_after.is_none_or(|t| txn.occurred_at >= t)
            && self.occurred_before.is_none_or(|t| txn.occurred_at <= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn test_key() -> StockKey {
        StockKey::new(
            ProductId::from_uuid(Uuid::from_u128(1)),
            WarehouseId::from_uuid(Uuid::from_u128(2)),
            LocationId::from_uuid(Uuid::from_u128(3)),
        )
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn journaled(kind: TransactionKind, quantity: i64, secs: i64) -> InventoryTransaction {
        InventoryTransaction::from_draft(
            TransactionDraft::new(test_key(), kind, quantity),
            TransactionId::new(),
            at(secs),
        )
    }

    #[test]
    fn draft_rejects_non_positive_quantity() {
        let draft = TransactionDraft::new(test_key(), TransactionKind::Receipt, 0);
        assert!(matches!(
            draft.validate().unwrap_err(),
            StockError::Validation(_)
        ));
    }

    #[test]
    fn draft_rejects_negative_cost() {
        let draft = TransactionDraft::new(test_key(), TransactionKind::Receipt, 1)
            .with_unit_cost(Decimal::from(-1));
        assert!(draft.validate().is_err());
    }

    #[test]
    fn stock_moving_drafts_require_a_cost_and_reservations_forbid_none() {
        let unpriced = TransactionDraft::new(test_key(), TransactionKind::Issue, 1);
        assert!(unpriced.validate().is_err());

        let priced = TransactionDraft::new(test_key(), TransactionKind::Issue, 1)
            .with_unit_cost(Decimal::from(2));
        assert!(priced.validate().is_ok());

        let reservation = TransactionDraft::new(test_key(), TransactionKind::Reservation, 1);
        assert!(reservation.validate().is_ok());
    }

    #[test]
    fn kind_classification() {
        assert!(TransactionKind::Receipt.is_inbound());
        assert!(TransactionKind::TransferOut.is_outbound());
        assert!(!TransactionKind::Reservation.is_inbound());
        assert!(!TransactionKind::Reservation.is_outbound());
        assert_eq!(TransactionKind::AdjustmentIn.as_str(), "adjustment_in");
    }

    #[test]
    fn filter_by_kind_and_date_range() {
        let issue = journaled(TransactionKind::Issue, 2, 150);
        let receipt = journaled(TransactionKind::Receipt, 5, 250);

        let filter = TransactionFilter {
            kind: Some(TransactionKind::Issue),
            ..TransactionFilter::default()
        };
        assert!(filter.matches(&issue));
        assert!(!filter.matches(&receipt));

        let filter = TransactionFilter {
            occurred_after: Some(at(200)),
            occurred_before: Some(at(300)),
            ..TransactionFilter::default()
        };
        assert!(!filter.matches(&issue));
        assert!(filter.matches(&receipt));
    }

    #[test]
    fn filter_by_key_components() {
        let txn = journaled(TransactionKind::Receipt, 5, 100);

        let filter = TransactionFilter {
            product_id: Some(txn.key.product_id),
            warehouse_id: Some(txn.key.warehouse_id),
            ..TransactionFilter::default()
        };
        assert!(filter.matches(&txn));

        let filter = TransactionFilter {
            product_id: Some(ProductId::from_uuid(Uuid::from_u128(99))),
            ..TransactionFilter::default()
        };
        assert!(!filter.matches(&txn));
    }
}
