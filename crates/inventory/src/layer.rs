//! FIFO cost layers: priced batches of on-hand stock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockforge_core::{StockError, StockKey, StockResult, TransactionId};

/// Cost layer identifier.
///
/// Assigned sequentially by the engine, so ascending id equals insertion
/// order — the tie-break when two layers share a `received_at` instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostLayerId(pub u64);

impl core::fmt::Display for CostLayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A priced batch of stock at one key.
///
/// Opened by a receipt, positive adjustment, or transfer-in; depleted
/// oldest-first by outbound movements. Layers that reach zero are retained
/// for audit traceability, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayer {
    id: CostLayerId,
    key: StockKey,
    source_transaction: TransactionId,
    remaining: i64,
    unit_cost: Decimal,
    received_at: DateTime<Utc>,
}

impl CostLayer {
    pub fn new(
        id: CostLayerId,
        key: StockKey,
        source_transaction: TransactionId,
        quantity: i64,
        unit_cost: Decimal,
        received_at: DateTime<Utc>,
    ) -> StockResult<Self> {
        if quantity <= 0 {
            return Err(StockError::validation("layer quantity must be positive"));
        }
        if unit_cost < Decimal::ZERO {
            return Err(StockError::validation("unit cost cannot be negative"));
        }
        Ok(Self {
            id,
            key,
            source_transaction,
            remaining: quantity,
            unit_cost,
            received_at,
        })
    }

    pub fn id(&self) -> CostLayerId {
        self.id
    }

    pub fn key(&self) -> &StockKey {
        &self.key
    }

    /// The receipt / adjustment-in / transfer-in transaction that opened
    /// this layer.
    pub fn source_transaction(&self) -> TransactionId {
        self.source_transaction
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn is_open(&self) -> bool {
        self.remaining > 0
    }

    /// Deplete part of this layer. Used when applying a consumption plan.
    pub fn consume_quantity(&mut self, quantity: i64) -> StockResult<()> {
        if quantity <= 0 {
            return Err(StockError::validation("consumed quantity must be positive"));
        }
        if quantity > self.remaining {
            return Err(StockError::invalid_state(format!(
                "layer {} holds {} but {} was consumed",
                self.id, self.remaining, quantity
            )));
        }
        self.remaining -= quantity;
        Ok(())
    }
}

/// One layer's share of a planned consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConsumption {
    pub layer_id: CostLayerId,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

/// The outcome of FIFO-selecting layers for an outbound quantity.
///
/// Built without mutating any layer; apply it afterwards with
/// [`apply_plan`]. `total_cost` is exact (`Σ quantity × unit_cost`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionPlan {
    pub parts: Vec<LayerConsumption>,
    pub quantity: i64,
    pub total_cost: Decimal,
}

impl ConsumptionPlan {
    /// Quantity-weighted average unit cost realized by this consumption.
    pub fn weighted_unit_cost(&self) -> Decimal {
        self.total_cost
            .checked_div(Decimal::from(self.quantity))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Select open layers FIFO (oldest `received_at` first, ties by ascending
/// layer id) until `quantity` is covered.
///
/// Fails with `InsufficientStock` when the open quantity across layers is
/// short; no layer is touched either way — the plan is applied separately.
pub fn plan_consumption(layers: &[CostLayer], quantity: i64) -> StockResult<ConsumptionPlan> {
    if quantity <= 0 {
        return Err(StockError::validation("consumption quantity must be positive"));
    }

    let mut open: Vec<&CostLayer> = layers.iter().filter(|l| l.is_open()).collect();
    open.sort_by_key(|l| (l.received_at(), l.id()));

    let available: i64 = open.iter().map(|l| l.remaining()).sum();
    if available < quantity {
        return Err(StockError::insufficient(quantity, available));
    }

    let mut parts = Vec::new();
    let mut outstanding = quantity;
    let mut total_cost = Decimal::ZERO;

    for layer in open {
        if outstanding == 0 {
            break;
        }
        let take = outstanding.min(layer.remaining());
        let cost = layer
            .unit_cost()
            .checked_mul(Decimal::from(take))
            .ok_or_else(|| StockError::invalid_state("consumption cost overflow"))?;
        total_cost = total_cost
            .checked_add(cost)
            .ok_or_else(|| StockError::invalid_state("consumption cost overflow"))?;
        parts.push(LayerConsumption {
            layer_id: layer.id(),
            quantity: take,
            unit_cost: layer.unit_cost(),
        });
        outstanding -= take;
    }

    Ok(ConsumptionPlan {
        parts,
        quantity,
        total_cost,
    })
}

/// Decrement the planned quantities from their layers.
///
/// Rejects a stale plan (a referenced layer missing or short) before any
/// decrement is applied.
pub fn apply_plan(layers: &mut [CostLayer], plan: &ConsumptionPlan) -> StockResult<()> {
    for part in &plan.parts {
        let layer = layers
            .iter()
            .find(|l| l.id() == part.layer_id)
            .ok_or_else(|| {
                StockError::invalid_state(format!("plan references unknown layer {}", part.layer_id))
            })?;
        if layer.remaining() < part.quantity {
            return Err(StockError::invalid_state(format!(
                "plan is stale for layer {}",
                part.layer_id
            )));
        }
    }

    for part in &plan.parts {
        if let Some(layer) = layers.iter_mut().find(|l| l.id() == part.layer_id) {
            layer.consume_quantity(part.quantity)?;
        }
    }
    Ok(())
}

/// Quantity-weighted average unit cost over open layers, if any quantity is
/// open. Used to price positive adjustments with no caller-supplied cost.
pub fn weighted_average_cost(layers: &[CostLayer]) -> Option<Decimal> {
    let mut quantity: i64 = 0;
    let mut value = Decimal::ZERO;

    for layer in layers.iter().filter(|l| l.is_open()) {
        quantity += layer.remaining();
        value = value.checked_add(layer.unit_cost().checked_mul(Decimal::from(layer.remaining()))?)?;
    }

    if quantity == 0 {
        return None;
    }
    value.checked_div(Decimal::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stockforge_core::{LocationId, ProductId, WarehouseId};
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

    fn layer(id: u64, quantity: i64, unit_cost: i64, received_secs: i64) -> CostLayer {
        CostLayer::new(
            CostLayerId(id),
            test_key(),
            TransactionId::from_uuid(Uuid::from_u128(id as u128)),
            quantity,
            Decimal::from(unit_cost),
            at(received_secs),
        )
        .unwrap()
    }

    #[test]
    fn consumes_oldest_layer_first() {
        let layers = vec![layer(2, 5, 2, 200), layer(1, 5, 1, 100)];

        let plan = plan_consumption(&layers, 7).unwrap();
        assert_eq!(plan.parts.len(), 2);
        assert_eq!(plan.parts[0].layer_id, CostLayerId(1));
        assert_eq!(plan.parts[0].quantity, 5);
        assert_eq!(plan.parts[1].layer_id, CostLayerId(2));
        assert_eq!(plan.parts[1].quantity, 2);
    }

    #[test]
    fn ties_on_received_at_break_by_layer_id() {
        let layers = vec![layer(8, 3, 4, 100), layer(7, 3, 3, 100)];

        let plan = plan_consumption(&layers, 4).unwrap();
        assert_eq!(plan.parts[0].layer_id, CostLayerId(7));
        assert_eq!(plan.parts[1].layer_id, CostLayerId(8));
        assert_eq!(plan.parts[1].quantity, 1);
    }

    #[test]
    fn weighted_cost_is_exact() {
        // 5 units at 1 plus 2 units at 2 over 7 units = 9/7.
        let layers = vec![layer(1, 5, 1, 100), layer(2, 5, 2, 200)];

        let plan = plan_consumption(&layers, 7).unwrap();
        assert_eq!(plan.total_cost, Decimal::from(9));
        assert_eq!(
            plan.weighted_unit_cost(),
            Decimal::from(9) / Decimal::from(7)
        );
    }

    #[test]
    fn insufficient_open_quantity_fails_without_planning() {
        let layers = vec![layer(1, 5, 1, 100)];

        let err = plan_consumption(&layers, 6).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                requested: 6,
                available: 5
            }
        );
    }

    #[test]
    fn depleted_layers_are_skipped_but_retained() {
        let mut layers = vec![layer(1, 5, 1, 100), layer(2, 5, 2, 200)];
        let plan = plan_consumption(&layers, 5).unwrap();
        apply_plan(&mut layers, &plan).unwrap();

        assert_eq!(layers[0].remaining(), 0);
        assert!(!layers[0].is_open());
        assert_eq!(layers.len(), 2);

        let plan = plan_consumption(&layers, 3).unwrap();
        assert_eq!(plan.parts.len(), 1);
        assert_eq!(plan.parts[0].layer_id, CostLayerId(2));
    }

    #[test]
    fn apply_plan_rejects_stale_plan_untouched() {
        let mut layers = vec![layer(1, 5, 1, 100)];
        let plan = plan_consumption(&layers, 4).unwrap();

        // Another consumption lands first; the plan is now stale.
        let first = plan_consumption(&layers, 3).unwrap();
        apply_plan(&mut layers, &first).unwrap();

        let err = apply_plan(&mut layers, &plan).unwrap_err();
        assert!(matches!(err, StockError::InvalidState(_)));
        assert_eq!(layers[0].remaining(), 2);
    }

    #[test]
    fn average_cost_weights_open_quantities() {
        let layers = vec![layer(1, 6, 2, 100), layer(2, 2, 6, 200)];
        // (6*2 + 2*6) / 8 = 3
        assert_eq!(weighted_average_cost(&layers), Some(Decimal::from(3)));

        let empty: Vec<CostLayer> = vec![];
        assert_eq!(weighted_average_cost(&empty), None);
    }
}
