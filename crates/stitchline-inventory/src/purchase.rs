use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;
use serde::Serialize;
use stitchline_core::{
    BatchOutcome, InventoryItem, InventoryStore, LedgerEntry, LedgerMetadata,
    LedgerReference, LedgerStore, PendingAdjustment, Purchase, PurchaseItem, PurchaseItemMetadata,
    PurchaseStatus, PurchaseStore, RestoreSource, TransactionType,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::InventoryError;
use crate::history::ledger_history;
use crate::transport::{TransportPlan, distribute_transport};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseMovement {
    pub purchase_item_id: Uuid,
    pub material_id: Uuid,
    pub material_name: String,
    pub quantity: Decimal,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub ledger_entry_id: Uuid,
    pub restore_source: Option<RestoreSource>,
}

impl PurchaseMovement {
    fn from_entry(purchase_item_id: Uuid, entry: &LedgerEntry, source: Option<RestoreSource>) -> Self {
        Self {
            purchase_item_id,
            material_id: entry.material_id,
            material_name: entry.metadata.material_name().to_string(),
            quantity: entry.quantity.abs(),
            previous_quantity: entry.previous_quantity,
            new_quantity: entry.new_quantity,
            ledger_entry_id: entry.id,
            restore_source: source,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.restore_source.is_some_and(|source| source.is_degraded())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseCompletion {
    pub transport: TransportPlan,
    pub outcome: BatchOutcome<PurchaseMovement>,
}

/// Receives purchased material into inventory and takes it back out again.
pub struct PurchaseInventory<S> {
    store: Arc<S>,
}

impl<S> Clone for PurchaseInventory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> PurchaseInventory<S>
where
    S: InventoryStore + LedgerStore + PurchaseStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn load(&self, purchase_id: Uuid, expected: PurchaseStatus) -> Result<Purchase, InventoryError> {
        let purchase = self
            .store
            .purchase(purchase_id)
            .await?
            .ok_or(InventoryError::PurchaseNotFound(purchase_id))?;
        if purchase.status != expected {
            return Err(InventoryError::purchase_status(
                purchase_id,
                purchase.status,
                expected,
            ));
        }
        Ok(purchase)
    }

    async fn materials(&self, items: &[PurchaseItem]) -> Result<HashMap<Uuid, InventoryItem>, InventoryError> {
        let ids: Vec<Uuid> = items.iter().map(|item| item.material_id).collect();
        Ok(self
            .store
            .inventory_items(&ids)
            .await?
            .into_iter()
            .map(|material| (material.id, material))
            .collect())
    }

    /// Adds each item's effective meter to inventory, prices items with their
    /// share of transport, and marks the purchase completed.
    pub async fn complete_with_actual_meter(&self, purchase_id: Uuid) -> Result<PurchaseCompletion, InventoryError> {
        let purchase = self.load(purchase_id, PurchaseStatus::Pending).await?;
        let items = self.store.purchase_items(purchase_id).await?;
        let materials = self.materials(&items).await?;

        let conversion_rates: HashMap<Uuid, Decimal> = materials
            .values()
            .filter_map(|m| m.conversion_rate.map(|rate| (m.id, rate)))
            .collect();
        let transport = distribute_transport(&items, &conversion_rates, purchase.transport_charge);

        let mut outcome = BatchOutcome::new();
        for item in &items {
            let (material_name, unit) = material_label(&materials, item.material_id);
            let adjusted_unit_price = transport
                .allocation(item.id)
                .map(|allocation| allocation.adjusted_unit_price);

            let adjustment = PendingAdjustment {
                material_id: item.material_id,
                transaction_type: TransactionType::Purchase,
                delta: item.effective_meter(),
                reference: LedgerReference::purchase(purchase_id),
                metadata: LedgerMetadata::PurchaseItem(PurchaseItemMetadata {
                    purchase_item_id: item.id,
                    material_name: material_name.clone(),
                    unit,
                    actual_meter: item.actual_meter,
                    adjusted_unit_price,
                    restore_source: None,
                }),
            };

            match self.store.post_adjustment(adjustment).await {
                Ok(entry) => outcome.record_success(PurchaseMovement::from_entry(item.id, &entry, None)),
                Err(err) => {
                    warn!("failed to receive {material_name} for purchase {purchase_id}: {err}");
                    outcome.record_failure(material_name, err);
                    continue;
                }
            }

            if let Some(price) = adjusted_unit_price {
                if let Err(err) = self.store.set_adjusted_unit_price(item.id, price).await {
                    warn!("failed to price {material_name} for purchase {purchase_id}: {err}");
                    outcome.record_failure(format!("{material_name} price"), err);
                }
            }
        }

        if outcome.success() {
            if let Err(err) = self
                .store
                .set_purchase_status(purchase_id, PurchaseStatus::Completed)
                .await
            {
                warn!("failed to mark purchase {purchase_id} completed: {err}");
                outcome.record_failure("purchase status", err);
            }
        }

        info!(
            "purchase {} received: {} items added, {} failures",
            purchase_id,
            outcome.succeeded_count(),
            outcome.failed_count()
        );
        Ok(PurchaseCompletion { transport, outcome })
    }

    /// Takes a completed purchase back out of inventory using the amounts its
    /// `purchase` rows recorded, net of earlier reversals. Items the ledger
    /// never saw are only subtracted when the purchase has no `purchase` rows
    /// at all.
    pub async fn reverse_completion(&self, purchase_id: Uuid) -> Result<BatchOutcome<PurchaseMovement>, InventoryError> {
        self.load(purchase_id, PurchaseStatus::Completed).await?;
        let items = self.store.purchase_items(purchase_id).await?;
        let materials = self.materials(&items).await?;
        let history = ledger_history(
            self.store.as_ref(),
            LedgerReference::purchase(purchase_id),
            &[TransactionType::Purchase, TransactionType::PurchaseReversal],
        )
        .await?;

        let legacy = !history
            .iter()
            .any(|entry| entry.transaction_type == TransactionType::Purchase);
        let mut received = outstanding_receipts(&history);

        let mut outcome = BatchOutcome::new();
        for item in &items {
            let (material_name, unit) = material_label(&materials, item.material_id);
            let (quantity, source) = match received.remove(&item.id) {
                Some(logged) => (logged, RestoreSource::Ledger),
                None if legacy => (item.effective_meter(), RestoreSource::EffectiveMeter),
                None => {
                    warn!("purchase item {} was never received; nothing to reverse", item.id);
                    continue;
                }
            };
            if quantity <= Decimal::ZERO {
                continue;
            }
            if source.is_degraded() {
                warn!(
                    "no purchase row for item {} on purchase {purchase_id}; reversing effective meter {quantity}",
                    item.id
                );
            }

            let adjustment = PendingAdjustment {
                material_id: item.material_id,
                transaction_type: TransactionType::PurchaseReversal,
                delta: -quantity,
                reference: LedgerReference::purchase(purchase_id),
                metadata: LedgerMetadata::PurchaseItem(PurchaseItemMetadata {
                    purchase_item_id: item.id,
                    material_name: material_name.clone(),
                    unit,
                    actual_meter: item.actual_meter,
                    adjusted_unit_price: item.adjusted_unit_price,
                    restore_source: Some(source),
                }),
            };

            match self.store.post_adjustment(adjustment).await {
                Ok(entry) => outcome.record_success(PurchaseMovement::from_entry(item.id, &entry, Some(source))),
                Err(err) => {
                    warn!("failed to reverse {material_name} for purchase {purchase_id}: {err}");
                    outcome.record_failure(material_name, err);
                }
            }
        }

        if outcome.success() {
            if let Err(err) = self
                .store
                .set_purchase_status(purchase_id, PurchaseStatus::Pending)
                .await
            {
                warn!("failed to reopen purchase {purchase_id}: {err}");
                outcome.record_failure("purchase status", err);
            }
        }

        info!(
            "purchase {} reversed: {} items removed, {} failures",
            purchase_id,
            outcome.succeeded_count(),
            outcome.failed_count()
        );
        Ok(outcome)
    }
}

/// Quantity still held per purchase item: receipts minus reversals, in
/// logged order, never below zero.
fn outstanding_receipts(history: &[LedgerEntry]) -> HashMap<Uuid, Decimal> {
    let mut outstanding: HashMap<Uuid, Decimal> = HashMap::new();
    for entry in history {
        let LedgerMetadata::PurchaseItem(meta) = &entry.metadata else {
            continue;
        };
        let held = outstanding.entry(meta.purchase_item_id).or_insert(Decimal::ZERO);
        match entry.transaction_type {
            TransactionType::Purchase => *held += entry.quantity.abs(),
            TransactionType::PurchaseReversal => {
                *held = (*held - entry.quantity.abs()).max(Decimal::ZERO);
            }
            _ => {}
        }
    }
    outstanding
}

fn material_label(materials: &HashMap<Uuid, InventoryItem>, material_id: Uuid) -> (String, String) {
    match materials.get(&material_id) {
        Some(material) => (material.material_name.clone(), material.unit.clone()),
        None => (material_id.to_string(), String::new()),
    }
}
