use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use stitchline_core::{
    Component, InventoryItem, InventoryStore, JobCard, LedgerEntry, LedgerQuery, LedgerStore,
    LinkedComponent, PendingAdjustment, ProductionStore, Purchase, PurchaseItem, PurchaseStatus,
    PurchaseStore, QuantityChange, StoreError, StoreResult,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    inventory: HashMap<Uuid, InventoryItem>,
    ledger: Vec<LedgerEntry>,
    job_cards: HashMap<Uuid, JobCard>,
    components: Vec<Component>,
    purchases: HashMap<Uuid, Purchase>,
    purchase_items: Vec<PurchaseItem>,
}

impl Tables {
    fn adjust(&mut self, material_id: Uuid, delta: Decimal) -> StoreResult<QuantityChange> {
        let item = self
            .inventory
            .get_mut(&material_id)
            .ok_or(StoreError::NotFound {
                entity: "inventory item",
                id: material_id,
            })?;

        let previous_quantity = item.quantity;
        item.quantity = previous_quantity + delta;

        Ok(QuantityChange {
            material_id,
            previous_quantity,
            new_quantity: item.quantity,
        })
    }
}

/// Store backed by process memory. Every write takes the single table lock,
/// which makes each adjustment and its ledger row one atomic step.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_inventory_item(&self, item: InventoryItem) {
        self.tables.write().await.inventory.insert(item.id, item);
    }

    pub async fn insert_job_card(&self, job_card: JobCard) {
        self.tables.write().await.job_cards.insert(job_card.id, job_card);
    }

    pub async fn remove_job_card(&self, job_card_id: Uuid) -> Option<JobCard> {
        self.tables.write().await.job_cards.remove(&job_card_id)
    }

    pub async fn insert_component(&self, component: Component) {
        self.tables.write().await.components.push(component);
    }

    pub async fn insert_purchase(&self, purchase: Purchase, items: Vec<PurchaseItem>) {
        let mut tables = self.tables.write().await;
        tables.purchases.insert(purchase.id, purchase);
        tables.purchase_items.extend(items);
    }

    /// Appends a ledger row as-is, for seeding history.
    pub async fn append_ledger_entry(&self, entry: LedgerEntry) {
        self.tables.write().await.ledger.push(entry);
    }

    pub async fn ledger(&self) -> Vec<LedgerEntry> {
        self.tables.read().await.ledger.clone()
    }

    pub async fn quantity(&self, material_id: Uuid) -> Option<Decimal> {
        self.tables
            .read()
            .await
            .inventory
            .get(&material_id)
            .map(|item| item.quantity)
    }

    pub async fn purchase_item(&self, item_id: Uuid) -> Option<PurchaseItem> {
        self.tables
            .read()
            .await
            .purchase_items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn inventory_items(&self, material_ids: &[Uuid]) -> StoreResult<Vec<InventoryItem>> {
        let tables = self.tables.read().await;
        Ok(material_ids
            .iter()
            .filter_map(|id| tables.inventory.get(id).cloned())
            .collect())
    }

    async fn adjust_quantity(&self, material_id: Uuid, delta: Decimal) -> StoreResult<QuantityChange> {
        self.tables.write().await.adjust(material_id, delta)
    }

    async fn post_adjustment(&self, adjustment: PendingAdjustment) -> StoreResult<LedgerEntry> {
        let mut tables = self.tables.write().await;
        let change = tables.adjust(adjustment.material_id, adjustment.delta)?;
        let entry = adjustment.into_entry(change, Utc::now());

        debug!(
            "ledger {} {} on {}: {} -> {}",
            entry.transaction_type,
            entry.quantity,
            entry.material_id,
            entry.previous_quantity,
            entry.new_quantity
        );
        tables.ledger.push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn ledger_entries(&self, query: LedgerQuery) -> StoreResult<Vec<LedgerEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ledger
            .iter()
            .filter(|entry| {
                entry.reference == query.reference
                    && entry.transaction_type == query.transaction_type
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProductionStore for InMemoryStore {
    async fn job_card(&self, job_card_id: Uuid) -> StoreResult<Option<JobCard>> {
        Ok(self.tables.read().await.job_cards.get(&job_card_id).cloned())
    }

    async fn order_components(&self, order_id: Uuid) -> StoreResult<Vec<LinkedComponent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .components
            .iter()
            .filter(|component| component.order_id == order_id)
            .map(|component| LinkedComponent {
                material: component
                    .material_id
                    .and_then(|id| tables.inventory.get(&id).cloned()),
                component: component.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl PurchaseStore for InMemoryStore {
    async fn purchase(&self, purchase_id: Uuid) -> StoreResult<Option<Purchase>> {
        Ok(self.tables.read().await.purchases.get(&purchase_id).cloned())
    }

    async fn purchase_items(&self, purchase_id: Uuid) -> StoreResult<Vec<PurchaseItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchase_items
            .iter()
            .filter(|item| item.purchase_id == purchase_id)
            .cloned()
            .collect())
    }

    async fn set_adjusted_unit_price(&self, item_id: Uuid, price: Decimal) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let item = tables
            .purchase_items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(StoreError::NotFound {
                entity: "purchase item",
                id: item_id,
            })?;
        item.adjusted_unit_price = Some(price);
        Ok(())
    }

    async fn set_purchase_status(&self, purchase_id: Uuid, status: PurchaseStatus) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let purchase = tables
            .purchases
            .get_mut(&purchase_id)
            .ok_or(StoreError::NotFound {
                entity: "purchase",
                id: purchase_id,
            })?;
        purchase.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stitchline_core::{
        ComponentMetadata, ComponentType, LedgerMetadata, LedgerReference, TransactionType,
    };

    use super::*;

    fn canvas(quantity: i64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            material_name: "Canvas".to_string(),
            quantity: Decimal::from(quantity),
            unit: "m".to_string(),
            conversion_rate: None,
        }
    }

    fn adjustment(material_id: Uuid, delta: Decimal) -> PendingAdjustment {
        PendingAdjustment {
            material_id,
            transaction_type: TransactionType::Consumption,
            delta,
            reference: LedgerReference::job_card(Uuid::new_v4()),
            metadata: LedgerMetadata::Component(ComponentMetadata {
                component_id: None,
                component_type: ComponentType::Part,
                material_name: "Canvas".to_string(),
                unit: "m".to_string(),
                order_id: None,
                job_card_id: None,
                restore_source: None,
            }),
        }
    }

    #[tokio::test]
    async fn adjust_quantity_reports_both_sides() {
        let store = InMemoryStore::new();
        let item = canvas(70);
        let id = item.id;
        store.insert_inventory_item(item).await;

        let change = store
            .adjust_quantity(id, Decimal::from(30))
            .await
            .expect("adjust");
        assert_eq!(change.previous_quantity, Decimal::from(70));
        assert_eq!(change.new_quantity, Decimal::from(100));
        assert_eq!(store.quantity(id).await, Some(Decimal::from(100)));
    }

    #[tokio::test]
    async fn unknown_material_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .adjust_quantity(Uuid::new_v4(), Decimal::ONE)
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn concurrent_adjustments_do_not_lose_updates() {
        let store = Arc::new(InMemoryStore::new());
        let item = canvas(0);
        let id = item.id;
        store.insert_inventory_item(item).await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .post_adjustment(adjustment(id, Decimal::ONE))
                    .await
                    .expect("post")
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(store.quantity(id).await, Some(Decimal::from(50)));
        let ledger = store.ledger().await;
        assert_eq!(ledger.len(), 50);
        assert!(
            ledger
                .iter()
                .all(|entry| entry.new_quantity == entry.previous_quantity + entry.quantity)
        );
    }
}
