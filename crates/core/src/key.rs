//! Composite key identifying one stock position.

use serde::{Deserialize, Serialize};

use crate::id::{LocationId, ProductId, WarehouseId};

/// `(product, warehouse, location)` — the granularity at which quantities
/// and cost layers are tracked.
///
/// `Ord` is derived lexicographically over the three components; multi-key
/// operations (transfers) acquire row locks in this order regardless of
/// transfer direction, which rules out lock-order deadlocks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub location_id: LocationId,
}

impl StockKey {
    pub fn new(product_id: ProductId, warehouse_id: WarehouseId, location_id: LocationId) -> Self {
        Self {
            product_id,
            warehouse_id,
            location_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.product_id, self.warehouse_id, self.location_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn key_from(product: u128, warehouse: u128, location: u128) -> StockKey {
        StockKey::new(
            ProductId::from_uuid(Uuid::from_u128(product)),
            WarehouseId::from_uuid(Uuid::from_u128(warehouse)),
            LocationId::from_uuid(Uuid::from_u128(location)),
        )
    }

    #[test]
    fn ordering_is_lexicographic_over_components() {
        let a = key_from(1, 9, 9);
        let b = key_from(2, 0, 0);
        let c = key_from(2, 0, 1);

        assert!(a < b);
        assert!(b < c);

        let mut keys = vec![c, a, b];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }
}
