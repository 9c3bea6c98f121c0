use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use stitchline_core::{
    InventoryItem, InventoryStore, JobCard, LedgerEntry, LedgerQuery, LedgerStore,
    LinkedComponent, PendingAdjustment, ProductionStore, Purchase, PurchaseItem, PurchaseStatus,
    PurchaseStore, QuantityChange, StoreError, StoreResult,
};
use stitchline_store::InMemoryStore;
use uuid::Uuid;

/// Wraps the in-memory store and fails writes for chosen materials, or
/// every batch input read.
pub struct FlakyStore {
    inner: Arc<InMemoryStore>,
    failing_materials: HashSet<Uuid>,
    failing_reads: bool,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>, failing_materials: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            inner,
            failing_materials: failing_materials.into_iter().collect(),
            failing_reads: false,
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }

    fn check_write(&self, material_id: Uuid) -> StoreResult<()> {
        if self.failing_materials.contains(&material_id) {
            return Err(StoreError::backend("connection reset"));
        }
        Ok(())
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.failing_reads {
            return Err(StoreError::backend("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for FlakyStore {
    async fn inventory_items(&self, material_ids: &[Uuid]) -> StoreResult<Vec<InventoryItem>> {
        self.check_read()?;
        self.inner.inventory_items(material_ids).await
    }

    async fn adjust_quantity(&self, material_id: Uuid, delta: Decimal) -> StoreResult<QuantityChange> {
        self.check_write(material_id)?;
        self.inner.adjust_quantity(material_id, delta).await
    }

    async fn post_adjustment(&self, adjustment: PendingAdjustment) -> StoreResult<LedgerEntry> {
        self.check_write(adjustment.material_id)?;
        self.inner.post_adjustment(adjustment).await
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn ledger_entries(&self, query: LedgerQuery) -> StoreResult<Vec<LedgerEntry>> {
        self.check_read()?;
        self.inner.ledger_entries(query).await
    }
}

#[async_trait]
impl ProductionStore for FlakyStore {
    async fn job_card(&self, job_card_id: Uuid) -> StoreResult<Option<JobCard>> {
        self.inner.job_card(job_card_id).await
    }

    async fn order_components(&self, order_id: Uuid) -> StoreResult<Vec<LinkedComponent>> {
        self.check_read()?;
        self.inner.order_components(order_id).await
    }
}

#[async_trait]
impl PurchaseStore for FlakyStore {
    async fn purchase(&self, purchase_id: Uuid) -> StoreResult<Option<Purchase>> {
        self.inner.purchase(purchase_id).await
    }

    async fn purchase_items(&self, purchase_id: Uuid) -> StoreResult<Vec<PurchaseItem>> {
        self.check_read()?;
        self.inner.purchase_items(purchase_id).await
    }

    async fn set_adjusted_unit_price(&self, item_id: Uuid, price: Decimal) -> StoreResult<()> {
        self.inner.set_adjusted_unit_price(item_id, price).await
    }

    async fn set_purchase_status(&self, purchase_id: Uuid, status: PurchaseStatus) -> StoreResult<()> {
        self.inner.set_purchase_status(purchase_id, status).await
    }
}
