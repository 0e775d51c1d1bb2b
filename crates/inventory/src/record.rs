//! Current quantity state per stock position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockforge_core::{LocationId, ProductId, StockError, StockKey, StockResult, WarehouseId};

/// Materialized quantity state for one `(product, warehouse, location)` key.
///
/// `available = on_hand - reserved` is derived, never stored. All mutators
/// enforce `0 <= reserved <= on_hand`; callers get an error and an untouched
/// record on violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    key: StockKey,
    on_hand: i64,
    reserved: i64,
    reorder_point: Option<i64>,
    reorder_quantity: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// Fresh record with zero quantities, created on first movement at a key.
    pub fn new(key: StockKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            on_hand: 0,
            reserved: 0,
            reorder_point: None,
            reorder_quantity: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn key(&self) -> &StockKey {
        &self.key
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    /// Quantity free for new reservations or issues.
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }

    pub fn reorder_point(&self) -> Option<i64> {
        self.reorder_point
    }

    pub fn reorder_quantity(&self) -> Option<i64> {
        self.reorder_quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Soft-deleted records stay queryable for audit but are excluded from
    /// default listings.
    pub fn is_retired(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether available stock has fallen to or under the reorder point.
    pub fn needs_reorder(&self) -> bool {
        match self.reorder_point {
            Some(point) if !self.is_retired() => self.available() <= point,
            _ => false,
        }
    }

    /// Apply an on-hand and/or reserved delta as one checked step.
    pub fn apply_movement(
        &mut self,
        on_hand_delta: i64,
        reserved_delta: i64,
        now: DateTime<Utc>,
    ) -> StockResult<()> {
        let on_hand = self
            .on_hand
            .checked_add(on_hand_delta)
            .ok_or_else(|| StockError::invalid_state("on-hand quantity overflow"))?;
        let reserved = self
            .reserved
            .checked_add(reserved_delta)
            .ok_or_else(|| StockError::invalid_state("reserved quantity overflow"))?;

        if on_hand < 0 {
            return Err(StockError::invalid_state(format!(
                "movement would drive on-hand negative ({on_hand}) at {}",
                self.key
            )));
        }
        if reserved < 0 {
            return Err(StockError::invalid_state(format!(
                "movement would drive reserved negative ({reserved}) at {}",
                self.key
            )));
        }
        if reserved > on_hand {
            return Err(StockError::invalid_state(format!(
                "movement would leave reserved ({reserved}) above on-hand ({on_hand}) at {}",
                self.key
            )));
        }

        self.on_hand = on_hand;
        self.reserved = reserved;
        self.touch(now);
        Ok(())
    }

    /// Earmark stock for a pending outbound operation.
    pub fn reserve(&mut self, quantity: i64, now: DateTime<Utc>) -> StockResult<()> {
        if quantity <= 0 {
            return Err(StockError::validation("reservation quantity must be positive"));
        }
        if quantity > self.available() {
            return Err(StockError::insufficient(quantity, self.available()));
        }
        self.reserved += quantity;
        self.touch(now);
        Ok(())
    }

    /// Release a previous reservation.
    pub fn unreserve(&mut self, quantity: i64, now: DateTime<Utc>) -> StockResult<()> {
        if quantity <= 0 {
            return Err(StockError::validation("unreservation quantity must be positive"));
        }
        if quantity > self.reserved {
            return Err(StockError::invalid_state(format!(
                "cannot unreserve {quantity}, only {} reserved at {}",
                self.reserved, self.key
            )));
        }
        self.reserved -= quantity;
        self.touch(now);
        Ok(())
    }

    /// Soft delete. Only legal once the position is fully empty.
    pub fn retire(&mut self, now: DateTime<Utc>) -> StockResult<()> {
        if self.on_hand != 0 || self.reserved != 0 {
            return Err(StockError::invalid_state(format!(
                "cannot retire {} with on-hand {} and reserved {}",
                self.key, self.on_hand, self.reserved
            )));
        }
        self.deleted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn set_reorder_levels(
        &mut self,
        reorder_point: Option<i64>,
        reorder_quantity: Option<i64>,
        now: DateTime<Utc>,
    ) -> StockResult<()> {
        if reorder_point.is_some_and(|p| p < 0) {
            return Err(StockError::validation("reorder point cannot be negative"));
        }
        if reorder_quantity.is_some_and(|q| q <= 0) {
            return Err(StockError::validation("reorder quantity must be positive"));
        }
        self.reorder_point = reorder_point;
        self.reorder_quantity = reorder_quantity;
        self.touch(now);
        Ok(())
    }

    /// Any movement at a retired key revives it.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.deleted_at = None;
    }
}

/// Read-side filter over inventory records.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
    pub location_id: Option<LocationId>,
    /// Include soft-deleted records. Off by default.
    pub include_retired: bool,
}

impl RecordFilter {
    pub fn matches(&self, record: &InventoryRecord) -> bool {
        if !self.include_retired && record.is_retired() {
            return false;
        }
        let key = record.key();
        self.product_id.is_none_or(|p| p == key.product_id)
            && self.warehouse_id.is_none_or(|w| w == key.warehouse_id)
            && self.location_id.is_none_or(|l| l == key.location_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockforge_core::{LocationId, ProductId, WarehouseId};
    use uuid::Uuid;

    fn test_key() -> StockKey {
        StockKey::new(
            ProductId::from_uuid(Uuid::from_u128(1)),
            WarehouseId::from_uuid(Uuid::from_u128(2)),
            LocationId::from_uuid(Uuid::from_u128(3)),
        )
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn movement_updates_on_hand() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.apply_movement(10, 0, test_time()).unwrap();
        assert_eq!(record.on_hand(), 10);
        assert_eq!(record.available(), 10);
    }

    #[test]
    fn movement_rejects_negative_on_hand() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.apply_movement(5, 0, test_time()).unwrap();

        let err = record.apply_movement(-6, 0, test_time()).unwrap_err();
        assert!(matches!(err, StockError::InvalidState(_)));
        assert_eq!(record.on_hand(), 5);
    }

    #[test]
    fn movement_rejects_reserved_above_on_hand() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.apply_movement(10, 0, test_time()).unwrap();
        record.reserve(8, test_time()).unwrap();

        // Issuing 5 would leave on-hand 5 below the 8 reserved.
        let err = record.apply_movement(-5, 0, test_time()).unwrap_err();
        assert!(matches!(err, StockError::InvalidState(_)));
        assert_eq!(record.on_hand(), 10);
        assert_eq!(record.reserved(), 8);
    }

    #[test]
    fn reserve_beyond_available_fails_unchanged() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.apply_movement(10, 0, test_time()).unwrap();
        record.reserve(7, test_time()).unwrap();

        let err = record.reserve(4, test_time()).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                requested: 4,
                available: 3
            }
        );
        assert_eq!(record.reserved(), 7);
    }

    #[test]
    fn unreserve_cannot_exceed_reserved() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.apply_movement(10, 0, test_time()).unwrap();
        record.reserve(2, test_time()).unwrap();

        let err = record.unreserve(3, test_time()).unwrap_err();
        assert!(matches!(err, StockError::InvalidState(_)));
        record.unreserve(2, test_time()).unwrap();
        assert_eq!(record.reserved(), 0);
    }

    #[test]
    fn retire_requires_empty_position() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.apply_movement(1, 0, test_time()).unwrap();

        assert!(record.retire(test_time()).is_err());

        record.apply_movement(-1, 0, test_time()).unwrap();
        record.retire(test_time()).unwrap();
        assert!(record.is_retired());

        // A new receipt revives the position.
        record.apply_movement(4, 0, test_time()).unwrap();
        assert!(!record.is_retired());
    }

    #[test]
    fn reorder_signal_uses_available_quantity() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.apply_movement(10, 0, test_time()).unwrap();
        record
            .set_reorder_levels(Some(4), Some(20), test_time())
            .unwrap();

        assert!(!record.needs_reorder());
        record.reserve(6, test_time()).unwrap();
        assert!(record.needs_reorder());
    }

    #[test]
    fn filter_skips_retired_by_default() {
        let mut record = InventoryRecord::new(test_key(), test_time());
        record.retire(test_time()).unwrap();

        let filter = RecordFilter::default();
        assert!(!filter.matches(&record));

        let filter = RecordFilter {
            include_retired: true,
            ..RecordFilter::default()
        };
        assert!(filter.matches(&record));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Inbound(i64),
        Outbound(i64),
        Reserve(i64),
        Unreserve(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..100).prop_map(Op::Inbound),
            (1i64..100).prop_map(Op::Outbound),
            (1i64..100).prop_map(Op::Reserve),
            (1i64..100).prop_map(Op::Unreserve),
        ]
    }

    proptest! {
        /// Property: no sequence of movements/reservations, successful or
        /// rejected, can leave the record outside 0 <= reserved <= on_hand.
        #[test]
        fn quantities_stay_within_bounds(ops in prop::collection::vec(op_strategy(), 1..64)) {
            let mut record = InventoryRecord::new(test_key(), test_time());

            for op in ops {
                let _ = match op {
                    Op::Inbound(q) => record.apply_movement(q, 0, test_time()),
                    Op::Outbound(q) => record.apply_movement(-q, 0, test_time()),
                    Op::Reserve(q) => record.reserve(q, test_time()),
                    Op::Unreserve(q) => record.unreserve(q, test_time()),
                };

                prop_assert!(record.reserved() >= 0);
                prop_assert!(record.reserved() <= record.on_hand());
            }
        }
    }
}
