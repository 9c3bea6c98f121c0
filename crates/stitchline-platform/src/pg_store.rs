use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow, types::Json};
use stitchline_core::{
    Component, InventoryItem, InventoryStore, JobCard, LedgerEntry, LedgerMetadata, LedgerQuery,
    LedgerReference, LedgerStore, LinkedComponent, PendingAdjustment, ProductionStore, Purchase,
    PurchaseItem, PurchaseStatus, PurchaseStore, QuantityChange, StoreError, StoreResult,
};
use tracing::debug;
use uuid::Uuid;

/// Postgres-backed store. Quantity changes lock the inventory row for the
/// length of one transaction, ledger insert included.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::backend(err)
}

async fn adjust_locked(
    tx: &mut Transaction<'_, Postgres>,
    material_id: Uuid,
    delta: Decimal,
) -> StoreResult<QuantityChange> {
    let previous_quantity: Decimal =
        sqlx::query("SELECT quantity FROM inventory WHERE id = $1 FOR UPDATE")
            .bind(material_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound {
                entity: "inventory item",
                id: material_id,
            })?
            .try_get("quantity")
            .map_err(backend)?;

    let new_quantity = previous_quantity + delta;
    sqlx::query("UPDATE inventory SET quantity = $2, updated_at = $3 WHERE id = $1")
        .bind(material_id)
        .bind(new_quantity)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(backend)?;

    Ok(QuantityChange {
        material_id,
        previous_quantity,
        new_quantity,
    })
}

async fn insert_ledger_entry(tx: &mut Transaction<'_, Postgres>, entry: &LedgerEntry) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_transaction_log (
            id, material_id, transaction_type, quantity, previous_quantity, new_quantity,
            reference_id, reference_type, metadata, transaction_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(entry.id)
    .bind(entry.material_id)
    .bind(entry.transaction_type.as_str())
    .bind(entry.quantity)
    .bind(entry.previous_quantity)
    .bind(entry.new_quantity)
    .bind(entry.reference.id)
    .bind(entry.reference.kind.as_str())
    .bind(Json(&entry.metadata))
    .bind(entry.transaction_date)
    .execute(&mut **tx)
    .await
    .map_err(backend)?;

    Ok(())
}

fn parse_column<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(backend)?;
    raw.parse().map_err(StoreError::backend)
}

fn inventory_item_from_row(row: &PgRow) -> StoreResult<InventoryItem> {
    Ok(InventoryItem {
        id: row.try_get("id").map_err(backend)?,
        material_name: row.try_get("material_name").map_err(backend)?,
        quantity: row.try_get("quantity").map_err(backend)?,
        unit: row.try_get("unit").map_err(backend)?,
        conversion_rate: row.try_get("conversion_rate").map_err(backend)?,
    })
}

fn linked_component_from_row(row: &PgRow) -> StoreResult<LinkedComponent> {
    let quantity: i32 = row.try_get("quantity").map_err(backend)?;
    let component = Component {
        id: row.try_get("id").map_err(backend)?,
        order_id: row.try_get("order_id").map_err(backend)?,
        component_type: parse_column(row, "component_type")?,
        length: row.try_get("length").map_err(backend)?,
        width: row.try_get("width").map_err(backend)?,
        roll_width: row.try_get("roll_width").map_err(backend)?,
        quantity: u32::try_from(quantity).map_err(StoreError::backend)?,
        material_id: row.try_get("material_id").map_err(backend)?,
        material_rate: row.try_get("material_rate").map_err(backend)?,
        formula: parse_column(row, "formula")?,
        consumption: row.try_get("consumption").map_err(backend)?,
        original_consumption: row.try_get("original_consumption").map_err(backend)?,
    };

    let material = match row.try_get::<Option<Uuid>, _>("inventory_id").map_err(backend)? {
        Some(id) => Some(InventoryItem {
            id,
            material_name: row.try_get("material_name").map_err(backend)?,
            quantity: row.try_get("inventory_quantity").map_err(backend)?,
            unit: row.try_get("unit").map_err(backend)?,
            conversion_rate: row.try_get("conversion_rate").map_err(backend)?,
        }),
        None => None,
    };

    Ok(LinkedComponent {
        component,
        material,
    })
}

fn ledger_entry_from_row(row: &PgRow) -> StoreResult<LedgerEntry> {
    let Json(metadata): Json<LedgerMetadata> = row.try_get("metadata").map_err(backend)?;
    Ok(LedgerEntry {
        id: row.try_get("id").map_err(backend)?,
        material_id: row.try_get("material_id").map_err(backend)?,
        transaction_type: parse_column(row, "transaction_type")?,
        quantity: row.try_get("quantity").map_err(backend)?,
        previous_quantity: row.try_get("previous_quantity").map_err(backend)?,
        new_quantity: row.try_get("new_quantity").map_err(backend)?,
        reference: LedgerReference {
            id: row.try_get("reference_id").map_err(backend)?,
            kind: parse_column(row, "reference_type")?,
        },
        metadata,
        transaction_date: row.try_get("transaction_date").map_err(backend)?,
    })
}

fn purchase_item_from_row(row: &PgRow) -> StoreResult<PurchaseItem> {
    Ok(PurchaseItem {
        id: row.try_get("id").map_err(backend)?,
        purchase_id: row.try_get("purchase_id").map_err(backend)?,
        material_id: row.try_get("material_id").map_err(backend)?,
        quantity: row.try_get("quantity").map_err(backend)?,
        actual_meter: row.try_get("actual_meter").map_err(backend)?,
        unit_price: row.try_get("unit_price").map_err(backend)?,
        adjusted_unit_price: row.try_get("adjusted_unit_price").map_err(backend)?,
    })
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn inventory_items(&self, material_ids: &[Uuid]) -> StoreResult<Vec<InventoryItem>> {
        sqlx::query(
            "SELECT id, material_name, quantity, unit, conversion_rate FROM inventory WHERE id = ANY($1)",
        )
        .bind(material_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?
        .iter()
        .map(inventory_item_from_row)
        .collect()
    }

    async fn adjust_quantity(&self, material_id: Uuid, delta: Decimal) -> StoreResult<QuantityChange> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let change = adjust_locked(&mut tx, material_id, delta).await?;
        tx.commit().await.map_err(backend)?;
        Ok(change)
    }

    async fn post_adjustment(&self, adjustment: PendingAdjustment) -> StoreResult<LedgerEntry> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let change = adjust_locked(&mut tx, adjustment.material_id, adjustment.delta).await?;
        let entry = adjustment.into_entry(change, Utc::now());
        insert_ledger_entry(&mut tx, &entry).await?;
        tx.commit().await.map_err(backend)?;

        debug!(
            "ledger {} {} on {}: {} -> {}",
            entry.transaction_type,
            entry.quantity,
            entry.material_id,
            entry.previous_quantity,
            entry.new_quantity
        );
        Ok(entry)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn ledger_entries(&self, query: LedgerQuery) -> StoreResult<Vec<LedgerEntry>> {
        sqlx::query(
            r#"
            SELECT id, material_id, transaction_type, quantity, previous_quantity, new_quantity,
                   reference_id, reference_type, metadata, transaction_date
            FROM inventory_transaction_log
            WHERE reference_id = $1 AND reference_type = $2 AND transaction_type = $3
            ORDER BY transaction_date
            "#,
        )
        .bind(query.reference.id)
        .bind(query.reference.kind.as_str())
        .bind(query.transaction_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?
        .iter()
        .map(ledger_entry_from_row)
        .collect()
    }
}

#[async_trait]
impl ProductionStore for PgStore {
    async fn job_card(&self, job_card_id: Uuid) -> StoreResult<Option<JobCard>> {
        let row = sqlx::query("SELECT id, order_id, created_at FROM job_cards WHERE id = $1")
            .bind(job_card_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(JobCard {
            id: row.try_get("id").map_err(backend)?,
            order_id: row.try_get("order_id").map_err(backend)?,
            created_at: row.try_get("created_at").map_err(backend)?,
        }))
    }

    async fn order_components(&self, order_id: Uuid) -> StoreResult<Vec<LinkedComponent>> {
        sqlx::query(
            r#"
            SELECT c.id, c.order_id, c.component_type, c.length, c.width, c.roll_width,
                   c.quantity, c.material_id, c.material_rate, c.formula, c.consumption,
                   c.original_consumption,
                   i.id AS inventory_id, i.material_name, i.quantity AS inventory_quantity,
                   i.unit, i.conversion_rate
            FROM order_components c
            LEFT JOIN inventory i ON i.id = c.material_id
            WHERE c.order_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?
        .iter()
        .map(linked_component_from_row)
        .collect()
    }
}

#[async_trait]
impl PurchaseStore for PgStore {
    async fn purchase(&self, purchase_id: Uuid) -> StoreResult<Option<Purchase>> {
        let row = sqlx::query(
            "SELECT id, supplier_name, status, transport_charge, created_at FROM purchases WHERE id = $1",
        )
        .bind(purchase_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Purchase {
            id: row.try_get("id").map_err(backend)?,
            supplier_name: row.try_get("supplier_name").map_err(backend)?,
            status: parse_column(&row, "status")?,
            transport_charge: row.try_get("transport_charge").map_err(backend)?,
            created_at: row.try_get("created_at").map_err(backend)?,
        }))
    }

    async fn purchase_items(&self, purchase_id: Uuid) -> StoreResult<Vec<PurchaseItem>> {
        sqlx::query(
            r#"
            SELECT id, purchase_id, material_id, quantity, actual_meter, unit_price, adjusted_unit_price
            FROM purchase_items
            WHERE purchase_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?
        .iter()
        .map(purchase_item_from_row)
        .collect()
    }

    async fn set_adjusted_unit_price(&self, item_id: Uuid, price: Decimal) -> StoreResult<()> {
        let result = sqlx::query("UPDATE purchase_items SET adjusted_unit_price = $2 WHERE id = $1")
            .bind(item_id)
            .bind(price)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "purchase item",
                id: item_id,
            });
        }
        Ok(())
    }

    async fn set_purchase_status(&self, purchase_id: Uuid, status: PurchaseStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE purchases SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(purchase_id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "purchase",
                id: purchase_id,
            });
        }
        Ok(())
    }
}
