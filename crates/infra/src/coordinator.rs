//! Operation orchestration across records, cost layers, and the journal.
//!
//! Every public mutation follows the same pipeline: permission check →
//! catalog existence checks → input validation → transactional body →
//! commit → best-effort audit. Any step failing before commit rolls the
//! whole operation back; `ConcurrentModification` is retried once against
//! fresh state before being surfaced.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::instrument;

use stockforge_auth::{permissions, Actor, Permission, PermissionGate};
use stockforge_core::{ProductId, StockError, StockKey, StockResult};
use stockforge_inventory::{
    CostLayer, InventoryRecord, InventoryTransaction, LotInfo, RecordFilter, ReferenceDocument,
    TransactionDraft, TransactionFilter, TransactionKind,
};

use crate::audit::{AuditEntry, AuditSink};
use crate::catalog::Catalog;
use crate::store::{InventoryDb, StockTxn};

/// Goods received from outside (purchase, production, return).
#[derive(Debug, Clone)]
pub struct GoodsReceipt {
    pub key: StockKey,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub lot: Option<LotInfo>,
    pub reference: Option<ReferenceDocument>,
}

/// Goods leaving stock (shipment, material issue).
#[derive(Debug, Clone)]
pub struct GoodsIssue {
    pub key: StockKey,
    pub quantity: i64,
    pub reference: Option<ReferenceDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentDirection {
    Increase,
    Decrease,
}

/// Stocktake / correction movement.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub key: StockKey,
    pub quantity: i64,
    pub direction: AdjustmentDirection,
    /// Booked cost for increases. Falls back to the key's current weighted
    /// average; required when no open layers exist.
    pub unit_cost: Option<Decimal>,
    pub reference: Option<ReferenceDocument>,
}

/// Two-leg movement between locations, atomic and cost-preserving.
#[derive(Debug, Clone)]
pub struct StockTransfer {
    pub source: StockKey,
    pub destination: StockKey,
    pub quantity: i64,
    pub reference: Option<ReferenceDocument>,
}

/// The pair of journal entries a committed transfer produced.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub outbound: InventoryTransaction,
    pub inbound: InventoryTransaction,
}

/// Before/after snapshots collected inside an operation for the audit sink.
struct AuditTrail {
    entity: String,
    before: JsonValue,
    after: JsonValue,
}

impl AuditTrail {
    fn new(
        key: &StockKey,
        before: Option<&InventoryRecord>,
        after: Option<&InventoryRecord>,
    ) -> Self {
        Self {
            entity: key.to_string(),
            before: snapshot(before),
            after: snapshot(after),
        }
    }
}

fn snapshot(record: Option<&InventoryRecord>) -> JsonValue {
    record
        .and_then(|r| serde_json::to_value(r).ok())
        .unwrap_or(JsonValue::Null)
}

/// The public surface of the ledger.
///
/// Collaborators are constructor-injected narrow interfaces; `Arc`-wrapped
/// trait objects work through the blanket impls on each trait.
#[derive(Debug)]
pub struct TransactionCoordinator<G, A, C> {
    db: Arc<InventoryDb>,
    gate: G,
    audit: A,
    catalog: C,
}

impl<G, A, C> TransactionCoordinator<G, A, C>
where
    G: PermissionGate,
    A: AuditSink,
    C: Catalog,
{
    pub fn new(db: Arc<InventoryDb>, gate: G, audit: A, catalog: C) -> Self {
        Self {
            db,
            gate,
            audit,
            catalog,
        }
    }

    pub fn db(&self) -> &Arc<InventoryDb> {
        &self.db
    }

    // ── mutating operations ──────────────────────────────────────────────

    #[instrument(skip_all, fields(user = %actor.user_id, key = %receipt.key, quantity = receipt.quantity))]
    pub fn record_goods_receipt(
        &self,
        actor: &Actor,
        receipt: GoodsReceipt,
    ) -> StockResult<InventoryTransaction> {
        self.authorize(actor, &permissions::INVENTORY_RECEIVE)?;
        require_positive(receipt.quantity, "receipt quantity")?;
        require_non_negative_cost(receipt.unit_cost)?;
        self.check_key(&receipt.key)?;

        let (entry, trail) = self.execute("inventory.receipt", |txn| {
            let now = Utc::now();
            let before = txn.records().get(&receipt.key)?;

            let mut draft =
                TransactionDraft::new(receipt.key, TransactionKind::Receipt, receipt.quantity)
                    .with_unit_cost(receipt.unit_cost);
            draft.lot = receipt.lot.clone();
            draft.reference = receipt.reference.clone();
            let entry = txn.log().append(draft, now)?;

            txn.cost_ledger().open_layer(
                entry.id,
                &receipt.key,
                receipt.quantity,
                receipt.unit_cost,
                now,
            )?;
            let after = txn
                .records()
                .apply_movement(&receipt.key, receipt.quantity, 0, now)?;

            let trail = AuditTrail::new(&receipt.key, before.as_ref(), Some(&after));
            Ok((entry, trail))
        })?;

        self.record_audit(actor, "inventory.receipt", trail);
        Ok(entry)
    }

    #[instrument(skip_all, fields(user = %actor.user_id, key = %issue.key, quantity = issue.quantity))]
    pub fn record_goods_issue(
        &self,
        actor: &Actor,
        issue: GoodsIssue,
    ) -> StockResult<InventoryTransaction> {
        self.authorize(actor, &permissions::INVENTORY_ISSUE)?;
        require_positive(issue.quantity, "issue quantity")?;
        self.check_key(&issue.key)?;

        let (entry, trail) = self.execute("inventory.issue", |txn| {
            let now = Utc::now();
            let before = txn.records().get(&issue.key)?;

            // Consume first: an insufficient position fails fast with
            // nothing staged.
            let plan = txn.cost_ledger().consume(&issue.key, issue.quantity)?;

            let mut draft =
                TransactionDraft::new(issue.key, TransactionKind::Issue, issue.quantity)
                    .with_unit_cost(plan.weighted_unit_cost());
            draft.reference = issue.reference.clone();
            let entry = txn.log().append(draft, now)?;

            let after = txn
                .records()
                .apply_movement(&issue.key, -issue.quantity, 0, now)?;

            let trail = AuditTrail::new(&issue.key, before.as_ref(), Some(&after));
            Ok((entry, trail))
        })?;

        self.record_audit(actor, "inventory.issue", trail);
        Ok(entry)
    }

    #[instrument(skip_all, fields(user = %actor.user_id, key = %adjustment.key, quantity = adjustment.quantity, direction = ?adjustment.direction))]
    pub fn adjust_inventory(
        &self,
        actor: &Actor,
        adjustment: StockAdjustment,
    ) -> StockResult<InventoryTransaction> {
        self.authorize(actor, &permissions::INVENTORY_ADJUST)?;
        require_positive(adjustment.quantity, "adjustment quantity")?;
        if let Some(cost) = adjustment.unit_cost {
            require_non_negative_cost(cost)?;
        }
        self.check_key(&adjustment.key)?;

        let (entry, trail) = self.execute("inventory.adjustment", |txn| {
            let now = Utc::now();
            let before = txn.records().get(&adjustment.key)?;

            let (entry, after) = match adjustment.direction {
                AdjustmentDirection::Increase => {
                    let unit_cost = match adjustment.unit_cost {
                        Some(cost) => cost,
                        None => txn
                            .cost_ledger()
                            .average_cost(&adjustment.key)?
                            .ok_or_else(|| {
                                StockError::validation(
                                    "increase adjustment needs a unit cost when no layers are open",
                                )
                            })?,
                    };

                    let mut draft = TransactionDraft::new(
                        adjustment.key,
                        TransactionKind::AdjustmentIn,
                        adjustment.quantity,
                    )
                    .with_unit_cost(unit_cost);
                    draft.reference = adjustment.reference.clone();
                    let entry = txn.log().append(draft, now)?;

                    txn.cost_ledger().open_layer(
                        entry.id,
                        &adjustment.key,
                        adjustment.quantity,
                        unit_cost,
                        now,
                    )?;
                    let after = txn.records().apply_movement(
                        &adjustment.key,
                        adjustment.quantity,
                        0,
                        now,
                    )?;
                    (entry, after)
                }
                AdjustmentDirection::Decrease => {
                    let plan = txn
                        .cost_ledger()
                        .consume(&adjustment.key, adjustment.quantity)?;

                    let mut draft = TransactionDraft::new(
                        adjustment.key,
                        TransactionKind::AdjustmentOut,
                        adjustment.quantity,
                    )
                    .with_unit_cost(plan.weighted_unit_cost());
                    draft.reference = adjustment.reference.clone();
                    let entry = txn.log().append(draft, now)?;

                    let after = txn.records().apply_movement(
                        &adjustment.key,
                        -adjustment.quantity,
                        0,
                        now,
                    )?;
                    (entry, after)
                }
            };

            let trail = AuditTrail::new(&adjustment.key, before.as_ref(), Some(&after));
            Ok((entry, trail))
        })?;

        self.record_audit(actor, "inventory.adjustment", trail);
        Ok(entry)
    }

    #[instrument(skip_all, fields(user = %actor.user_id, key = %key, quantity = quantity))]
    pub fn reserve_inventory(
        &self,
        actor: &Actor,
        key: StockKey,
        quantity: i64,
    ) -> StockResult<InventoryTransaction> {
        self.authorize(actor, &permissions::INVENTORY_RESERVE)?;
        require_positive(quantity, "reservation quantity")?;
        self.check_key(&key)?;

        let (entry, trail) = self.execute("inventory.reserve", |txn| {
            let now = Utc::now();
            let before = txn.records().get(&key)?;
            let after = txn.records().reserve(&key, quantity, now)?;
            let entry = txn.log().append(
                TransactionDraft::new(key, TransactionKind::Reservation, quantity),
                now,
            )?;
            let trail = AuditTrail::new(&key, before.as_ref(), Some(&after));
            Ok((entry, trail))
        })?;

        self.record_audit(actor, "inventory.reserve", trail);
        Ok(entry)
    }

    #[instrument(skip_all, fields(user = %actor.user_id, key = %key, quantity = quantity))]
    pub fn unreserve_inventory(
        &self,
        actor: &Actor,
        key: StockKey,
        quantity: i64,
    ) -> StockResult<InventoryTransaction> {
        self.authorize(actor, &permissions::INVENTORY_RESERVE)?;
        require_positive(quantity, "unreservation quantity")?;
        self.check_key(&key)?;

        let (entry, trail) = self.execute("inventory.unreserve", |txn| {
            let now = Utc::now();
            let before = txn.records().get(&key)?;
            let after = txn.records().unreserve(&key, quantity, now)?;
            let entry = txn.log().append(
                TransactionDraft::new(key, TransactionKind::Unreservation, quantity),
                now,
            )?;
            let trail = AuditTrail::new(&key, before.as_ref(), Some(&after));
            Ok((entry, trail))
        })?;

        self.record_audit(actor, "inventory.unreserve", trail);
        Ok(entry)
    }

    #[instrument(skip_all, fields(user = %actor.user_id, source = %transfer.source, destination = %transfer.destination, quantity = transfer.quantity))]
    pub fn transfer_stock(
        &self,
        actor: &Actor,
        transfer: StockTransfer,
    ) -> StockResult<TransferOutcome> {
        self.authorize(actor, &permissions::INVENTORY_TRANSFER)?;
        require_positive(transfer.quantity, "transfer quantity")?;
        if transfer.source.product_id != transfer.destination.product_id {
            return Err(StockError::validation(
                "transfer must stay within one product",
            ));
        }
        if transfer.source == transfer.destination {
            return Err(StockError::validation(
                "transfer source and destination must differ",
            ));
        }
        self.check_key(&transfer.source)?;
        self.check_key(&transfer.destination)?;

        let (outcome, trails) = self.execute("inventory.transfer", |txn| {
            let now = Utc::now();
            // Both row locks up front, in ascending key order regardless of
            // transfer direction.
            txn.lock_keys(&[transfer.source, transfer.destination])?;

            let source_before = txn.records().get(&transfer.source)?;
            let destination_before = txn.records().get(&transfer.destination)?;

            let plan = txn
                .cost_ledger()
                .consume(&transfer.source, transfer.quantity)?;
            let unit_cost = plan.weighted_unit_cost();

            let mut outbound_draft = TransactionDraft::new(
                transfer.source,
                TransactionKind::TransferOut,
                transfer.quantity,
            )
            .with_unit_cost(unit_cost);
            outbound_draft.reference = transfer.reference.clone();
            let outbound = txn.log().append(outbound_draft, now)?;
            let source_after =
                txn.records()
                    .apply_movement(&transfer.source, -transfer.quantity, 0, now)?;

            let mut inbound_draft = TransactionDraft::new(
                transfer.destination,
                TransactionKind::TransferIn,
                transfer.quantity,
            )
            .with_unit_cost(unit_cost);
            inbound_draft.reference = transfer.reference.clone();
            let inbound = txn.log().append(inbound_draft, now)?;
            txn.cost_ledger().open_layer(
                inbound.id,
                &transfer.destination,
                transfer.quantity,
                unit_cost,
                now,
            )?;
            let destination_after =
                txn.records()
                    .apply_movement(&transfer.destination, transfer.quantity, 0, now)?;

            let trails = [
                AuditTrail::new(
                    &transfer.source,
                    source_before.as_ref(),
                    Some(&source_after),
                ),
                AuditTrail::new(
                    &transfer.destination,
                    destination_before.as_ref(),
                    Some(&destination_after),
                ),
            ];
            Ok((TransferOutcome { outbound, inbound }, trails))
        })?;

        for trail in trails {
            self.record_audit(actor, "inventory.transfer", trail);
        }
        Ok(outcome)
    }

    #[instrument(skip_all, fields(user = %actor.user_id, key = %key))]
    pub fn retire_record(&self, actor: &Actor, key: StockKey) -> StockResult<InventoryRecord> {
        self.authorize(actor, &permissions::INVENTORY_MANAGE)?;
        self.check_key(&key)?;

        let (record, trail) = self.execute("inventory.retire", |txn| {
            let now = Utc::now();
            let before = txn.records().get(&key)?;
            let after = txn.records().retire(&key, now)?;
            let trail = AuditTrail::new(&key, before.as_ref(), Some(&after));
            Ok((after, trail))
        })?;

        self.record_audit(actor, "inventory.retire", trail);
        Ok(record)
    }

    #[instrument(skip_all, fields(user = %actor.user_id, key = %key))]
    pub fn set_reorder_levels(
        &self,
        actor: &Actor,
        key: StockKey,
        reorder_point: Option<i64>,
        reorder_quantity: Option<i64>,
    ) -> StockResult<InventoryRecord> {
        self.authorize(actor, &permissions::INVENTORY_MANAGE)?;
        self.check_key(&key)?;

        let (record, trail) = self.execute("inventory.reorder_levels", |txn| {
            let now = Utc::now();
            let before = txn.records().get(&key)?;
            let after = txn
                .records()
                .set_reorder_levels(&key, reorder_point, reorder_quantity, now)?;
            let trail = AuditTrail::new(&key, before.as_ref(), Some(&after));
            Ok((after, trail))
        })?;

        self.record_audit(actor, "inventory.reorder_levels", trail);
        Ok(record)
    }

    // ── read accessors ───────────────────────────────────────────────────

    pub fn get_by_key(&self, key: &StockKey) -> StockResult<Option<InventoryRecord>> {
        self.db.record(key)
    }

    pub fn get_all_filtered(&self, filter: &RecordFilter) -> StockResult<Vec<InventoryRecord>> {
        self.db.records(filter)
    }

    pub fn get_by_product(&self, product_id: ProductId) -> StockResult<Vec<InventoryRecord>> {
        self.db.records_for_product(product_id)
    }

    pub fn below_reorder_point(&self) -> StockResult<Vec<InventoryRecord>> {
        self.db.records_below_reorder()
    }

    pub fn open_layers(&self, key: &StockKey) -> StockResult<Vec<CostLayer>> {
        self.db.open_layers(key)
    }

    pub fn transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StockResult<Vec<InventoryTransaction>> {
        self.db.transactions(filter)
    }

    // ── pipeline plumbing ────────────────────────────────────────────────

    fn authorize(&self, actor: &Actor, permission: &Permission) -> StockResult<()> {
        if self.gate.check(actor, permission) {
            Ok(())
        } else {
            Err(StockError::permission_denied(format!(
                "user {} lacks '{permission}'",
                actor.user_id
            )))
        }
    }

    fn check_key(&self, key: &StockKey) -> StockResult<()> {
        if !self.catalog.product_exists(key.product_id)? {
            return Err(StockError::not_found(format!("product {}", key.product_id)));
        }
        if !self.catalog.warehouse_exists(key.warehouse_id)? {
            return Err(StockError::not_found(format!(
                "warehouse {}",
                key.warehouse_id
            )));
        }
        if !self
            .catalog
            .location_exists(key.warehouse_id, key.location_id)?
        {
            return Err(StockError::not_found(format!(
                "location {} in warehouse {}",
                key.location_id, key.warehouse_id
            )));
        }
        Ok(())
    }

    /// Run `body` inside a fresh transaction; commit on `Ok`, roll back on
    /// `Err`. A lock conflict gets one retry against fresh state.
    fn execute<T>(
        &self,
        operation: &'static str,
        body: impl Fn(&mut StockTxn) -> StockResult<T>,
    ) -> StockResult<T> {
        let mut retried = false;
        loop {
            let attempt = self.db.begin().and_then(|mut txn| {
                let value = body(&mut txn)?;
                txn.commit()?;
                Ok(value)
            });

            match attempt {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && !retried => {
                    retried = true;
                    tracing::warn!(operation, error = %err, "retrying after concurrent modification");
                }
                Err(err) => {
                    if err.is_fatal() {
                        tracing::error!(operation, error = %err, "operation failed fatally");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Audit after commit; a sink failure is logged, never propagated.
    fn record_audit(&self, actor: &Actor, action: &'static str, trail: AuditTrail) {
        let entry = AuditEntry {
            user_id: actor.user_id,
            action: action.to_string(),
            entity: trail.entity,
            before: trail.before,
            after: trail.after,
            recorded_at: Utc::now(),
        };
        if let Err(err) = self.audit.record(entry) {
            tracing::warn!(action, error = %err, "audit sink failed after commit");
        }
    }
}

fn require_positive(quantity: i64, what: &str) -> StockResult<()> {
    if quantity <= 0 {
        return Err(StockError::validation(format!("{what} must be positive")));
    }
    Ok(())
}

fn require_non_negative_cost(cost: Decimal) -> StockResult<()> {
    if cost < Decimal::ZERO {
        return Err(StockError::validation("unit cost cannot be negative"));
    }
    Ok(())
}
