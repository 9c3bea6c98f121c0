use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::ledger::{LedgerEntry, LedgerQuery, PendingAdjustment, QuantityChange};
use crate::models::{InventoryItem, JobCard, LinkedComponent, Purchase, PurchaseItem, PurchaseStatus};

/// Owner of the only mutable shared state: on-hand material quantities.
///
/// Implementations must apply `adjust_quantity` and `post_adjustment` as a
/// single atomic read-modify-write per call.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn inventory_items(&self, material_ids: &[Uuid]) -> StoreResult<Vec<InventoryItem>>;

    async fn adjust_quantity(&self, material_id: Uuid, delta: Decimal) -> StoreResult<QuantityChange>;

    /// Applies the adjustment and appends its ledger row in one unit.
    async fn post_adjustment(&self, adjustment: PendingAdjustment) -> StoreResult<LedgerEntry>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn ledger_entries(&self, query: LedgerQuery) -> StoreResult<Vec<LedgerEntry>>;
}

#[async_trait]
pub trait ProductionStore: Send + Sync {
    async fn job_card(&self, job_card_id: Uuid) -> StoreResult<Option<JobCard>>;

    async fn order_components(&self, order_id: Uuid) -> StoreResult<Vec<LinkedComponent>>;
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn purchase(&self, purchase_id: Uuid) -> StoreResult<Option<Purchase>>;

    async fn purchase_items(&self, purchase_id: Uuid) -> StoreResult<Vec<PurchaseItem>>;

    async fn set_adjusted_unit_price(&self, item_id: Uuid, price: Decimal) -> StoreResult<()>;

    async fn set_purchase_status(&self, purchase_id: Uuid, status: PurchaseStatus) -> StoreResult<()>;
}
