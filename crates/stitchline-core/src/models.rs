use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rounds a meter or price figure to the four decimals every stored value uses.
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Part,
    Border,
    Handle,
    Chain,
    Runner,
    Piping,
    Custom,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Part => "part",
            Self::Border => "border",
            Self::Handle => "handle",
            Self::Chain => "chain",
            Self::Runner => "runner",
            Self::Piping => "piping",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "part" => Ok(Self::Part),
            "border" => Ok(Self::Border),
            "handle" => Ok(Self::Handle),
            "chain" => Ok(Self::Chain),
            "runner" => Ok(Self::Runner),
            "piping" => Ok(Self::Piping),
            "custom" => Ok(Self::Custom),
            other => Err(ParseEnumError {
                kind: "component type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionFormula {
    #[default]
    Standard,
    Linear,
    Manual,
}

impl ConsumptionFormula {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Linear => "linear",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ConsumptionFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsumptionFormula {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "linear" => Ok(Self::Linear),
            "manual" => Ok(Self::Manual),
            other => Err(ParseEnumError {
                kind: "consumption formula",
                value: other.to_string(),
            }),
        }
    }
}

/// A part of a manufactured product, attached to an order line.
///
/// Measurements are in inches, `consumption` is in meters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub id: Uuid,
    pub order_id: Uuid,
    pub component_type: ComponentType,
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub roll_width: Option<Decimal>,
    pub quantity: u32,
    pub material_id: Option<Uuid>,
    pub material_rate: Option<Decimal>,
    pub formula: ConsumptionFormula,
    pub consumption: Decimal,
    /// Per-unit manual figure captured the first time the order multiplier ran.
    #[serde(default)]
    pub original_consumption: Option<Decimal>,
}

impl Component {
    pub fn is_manual_consumption(&self) -> bool {
        self.formula == ConsumptionFormula::Manual
    }
}

/// A component joined with the inventory row of its material, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedComponent {
    pub component: Component,
    pub material: Option<InventoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub material_name: String,
    pub quantity: Decimal,
    pub unit: String,
    /// Weight per unit, used to spread purchase transport charges.
    #[serde(default)]
    pub conversion_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCard {
    pub id: Uuid,
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for PurchaseStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(ParseEnumError {
                kind: "purchase status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Purchase {
    pub id: Uuid,
    pub supplier_name: String,
    pub status: PurchaseStatus,
    pub transport_charge: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub material_id: Uuid,
    pub quantity: Decimal,
    #[serde(default)]
    pub actual_meter: Option<Decimal>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub adjusted_unit_price: Option<Decimal>,
}

impl PurchaseItem {
    /// The meters that actually move inventory: the measured figure when one
    /// was recorded, otherwise the ordered quantity.
    pub fn effective_meter(&self) -> Decimal {
        match self.actual_meter {
            Some(meter) if meter > Decimal::ZERO => meter,
            _ => self.quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: Decimal, actual_meter: Option<Decimal>) -> PurchaseItem {
        PurchaseItem {
            id: Uuid::new_v4(),
            purchase_id: Uuid::new_v4(),
            material_id: Uuid::new_v4(),
            quantity,
            actual_meter,
            unit_price: Decimal::ONE,
            adjusted_unit_price: None,
        }
    }

    #[test]
    fn effective_meter_prefers_positive_actual_meter() {
        assert_eq!(
            item(Decimal::from(10), Some(Decimal::new(125, 1))).effective_meter(),
            Decimal::new(125, 1)
        );
        assert_eq!(
            item(Decimal::from(10), Some(Decimal::ZERO)).effective_meter(),
            Decimal::from(10)
        );
        assert_eq!(item(Decimal::from(10), None).effective_meter(), Decimal::from(10));
    }

    #[test]
    fn round_quantity_rounds_half_away_from_zero() {
        assert_eq!(round_quantity(Decimal::new(123455, 5)), Decimal::new(12346, 4));
        assert_eq!(round_quantity(Decimal::new(-123455, 5)), Decimal::new(-12346, 4));
    }

    #[test]
    fn enums_parse_their_wire_names() {
        assert_eq!("Piping".parse::<ComponentType>(), Ok(ComponentType::Piping));
        assert_eq!(
            "manual".parse::<ConsumptionFormula>(),
            Ok(ConsumptionFormula::Manual)
        );
        assert!("zipper".parse::<ComponentType>().is_err());
    }
}
