//! Read-only catalog lookups consumed before any mutation.

use std::collections::HashSet;
use std::sync::Arc;

use stockforge_core::{LocationId, ProductId, StockResult, WarehouseId};

/// Existence checks against the surrounding suite's master data.
///
/// The coordinator consults these before any mutation; a missing reference
/// fails fast with `NotFound` and zero side effects. Lookups are read-only
/// by contract.
pub trait Catalog: Send + Sync {
    fn product_exists(&self, product_id: ProductId) -> StockResult<bool>;
    fn warehouse_exists(&self, warehouse_id: WarehouseId) -> StockResult<bool>;
    fn location_exists(
        &self,
        warehouse_id: WarehouseId,
        location_id: LocationId,
    ) -> StockResult<bool>;
}

impl<C> Catalog for Arc<C>
where
    C: Catalog + ?Sized,
{
    fn product_exists(&self, product_id: ProductId) -> StockResult<bool> {
        (**self).product_exists(product_id)
    }

    fn warehouse_exists(&self, warehouse_id: WarehouseId) -> StockResult<bool> {
        (**self).warehouse_exists(warehouse_id)
    }

    fn location_exists(
        &self,
        warehouse_id: WarehouseId,
        location_id: LocationId,
    ) -> StockResult<bool> {
        (**self).location_exists(warehouse_id, location_id)
    }
}

/// Set-backed catalog for tests/dev.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: HashSet<ProductId>,
    warehouses: HashSet<WarehouseId>,
    locations: HashSet<(WarehouseId, LocationId)>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.products.insert(product_id);
        self
    }

    pub fn with_location(mut self, warehouse_id: WarehouseId, location_id: LocationId) -> Self {
        self.warehouses.insert(warehouse_id);
        self.locations.insert((warehouse_id, location_id));
        self
    }
}

impl Catalog for StaticCatalog {
    fn product_exists(&self, product_id: ProductId) -> StockResult<bool> {
        Ok(self.products.contains(&product_id))
    }

    fn warehouse_exists(&self, warehouse_id: WarehouseId) -> StockResult<bool> {
        Ok(self.warehouses.contains(&warehouse_id))
    }

    fn location_exists(
        &self,
        warehouse_id: WarehouseId,
        location_id: LocationId,
    ) -> StockResult<bool> {
        Ok(self.locations.contains(&(warehouse_id, location_id)))
    }
}

/// Catalog that treats every reference as existing. Tests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCatalog;

impl Catalog for OpenCatalog {
    fn product_exists(&self, _product_id: ProductId) -> StockResult<bool> {
        Ok(true)
    }

    fn warehouse_exists(&self, _warehouse_id: WarehouseId) -> StockResult<bool> {
        Ok(true)
    }

    fn location_exists(
        &self,
        _warehouse_id: WarehouseId,
        _location_id: LocationId,
    ) -> StockResult<bool> {
        Ok(true)
    }
}
