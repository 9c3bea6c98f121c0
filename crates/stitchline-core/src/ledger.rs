use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ComponentType, ParseEnumError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    Consumption,
    Purchase,
    JobCardReversal,
    PurchaseReversal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumption => "consumption",
            Self::Purchase => "purchase",
            Self::JobCardReversal => "job-card-reversal",
            Self::PurchaseReversal => "purchase-reversal",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "consumption" => Ok(Self::Consumption),
            "purchase" => Ok(Self::Purchase),
            "job-card-reversal" => Ok(Self::JobCardReversal),
            "purchase-reversal" => Ok(Self::PurchaseReversal),
            other => Err(ParseEnumError {
                kind: "transaction type",
                value: other.to_string(),
            }),
        }
    }
}

/// Kind of record that caused a ledger entry. Stored as `JobCard`, `Order`, `Purchase`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    JobCard,
    Order,
    Purchase,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobCard => "JobCard",
            Self::Order => "Order",
            Self::Purchase => "Purchase",
        }
    }
}

impl FromStr for ReferenceType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "JobCard" => Ok(Self::JobCard),
            "Order" => Ok(Self::Order),
            "Purchase" => Ok(Self::Purchase),
            other => Err(ParseEnumError {
                kind: "reference type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LedgerReference {
    pub id: Uuid,
    pub kind: ReferenceType,
}

impl LedgerReference {
    pub fn job_card(id: Uuid) -> Self {
        Self {
            id,
            kind: ReferenceType::JobCard,
        }
    }

    pub fn purchase(id: Uuid) -> Self {
        Self {
            id,
            kind: ReferenceType::Purchase,
        }
    }
}

/// Where a restored quantity came from. Anything other than `Ledger` is a
/// best-effort figure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RestoreSource {
    Ledger,
    CurrentConsumption,
    EffectiveMeter,
}

impl RestoreSource {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Ledger)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentMetadata {
    /// Absent on rows written before component ids were recorded.
    #[serde(default)]
    pub component_id: Option<Uuid>,
    pub component_type: ComponentType,
    pub material_name: String,
    pub unit: String,
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub job_card_id: Option<Uuid>,
    #[serde(default)]
    pub restore_source: Option<RestoreSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseItemMetadata {
    pub purchase_item_id: Uuid,
    pub material_name: String,
    pub unit: String,
    #[serde(default)]
    pub actual_meter: Option<Decimal>,
    #[serde(default)]
    pub adjusted_unit_price: Option<Decimal>,
    #[serde(default)]
    pub restore_source: Option<RestoreSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerMetadata {
    Component(ComponentMetadata),
    PurchaseItem(PurchaseItemMetadata),
}

impl LedgerMetadata {
    pub fn material_name(&self) -> &str {
        match self {
            Self::Component(meta) => &meta.material_name,
            Self::PurchaseItem(meta) => &meta.material_name,
        }
    }
}

/// Result of one atomic read-modify-write on an inventory quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuantityChange {
    pub material_id: Uuid,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
}

impl QuantityChange {
    pub fn delta(&self) -> Decimal {
        self.new_quantity - self.previous_quantity
    }
}

/// An adjustment waiting to be applied together with its ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAdjustment {
    pub material_id: Uuid,
    pub transaction_type: TransactionType,
    /// Signed: negative deducts, positive adds.
    pub delta: Decimal,
    pub reference: LedgerReference,
    pub metadata: LedgerMetadata,
}

impl PendingAdjustment {
    pub fn into_entry(self, change: QuantityChange, transaction_date: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            material_id: self.material_id,
            transaction_type: self.transaction_type,
            quantity: change.delta(),
            previous_quantity: change.previous_quantity,
            new_quantity: change.new_quantity,
            reference: self.reference,
            metadata: self.metadata,
            transaction_date,
        }
    }
}

/// Append-only audit row for one inventory quantity change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub material_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub reference: LedgerReference,
    pub metadata: LedgerMetadata,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerQuery {
    pub reference: LedgerReference,
    pub transaction_type: TransactionType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_quantity_matches_the_applied_change() {
        let material_id = Uuid::new_v4();
        let adjustment = PendingAdjustment {
            material_id,
            transaction_type: TransactionType::JobCardReversal,
            delta: Decimal::from(30),
            reference: LedgerReference::job_card(Uuid::new_v4()),
            metadata: LedgerMetadata::Component(ComponentMetadata {
                component_id: Some(Uuid::new_v4()),
                component_type: ComponentType::Border,
                material_name: "Canvas".to_string(),
                unit: "m".to_string(),
                order_id: None,
                job_card_id: None,
                restore_source: Some(RestoreSource::Ledger),
            }),
        };
        let change = QuantityChange {
            material_id,
            previous_quantity: Decimal::from(70),
            new_quantity: Decimal::from(100),
        };

        let entry = adjustment.into_entry(change, Utc::now());
        assert_eq!(entry.quantity, Decimal::from(30));
        assert_eq!(entry.new_quantity, entry.previous_quantity + entry.quantity);
    }

    #[test]
    fn metadata_serializes_as_tagged_record() {
        let meta = LedgerMetadata::Component(ComponentMetadata {
            component_id: None,
            component_type: ComponentType::Handle,
            material_name: "Webbing".to_string(),
            unit: "m".to_string(),
            order_id: None,
            job_card_id: None,
            restore_source: None,
        });

        let value = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(value["kind"], "component");
        assert_eq!(value["component_type"], "handle");

        let legacy = serde_json::json!({
            "kind": "component",
            "component_type": "handle",
            "material_name": "Webbing",
            "unit": "m"
        });
        let parsed: LedgerMetadata = serde_json::from_value(legacy).expect("deserialize");
        assert_eq!(parsed, meta);
    }

    #[test]
    fn transaction_types_use_kebab_case() {
        assert_eq!(
            serde_json::to_value(TransactionType::JobCardReversal).expect("serialize"),
            "job-card-reversal"
        );
        assert_eq!(
            "purchase-reversal".parse::<TransactionType>(),
            Ok(TransactionType::PurchaseReversal)
        );
    }
}
