use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stitchline_core::{ConsumptionFormula, round_quantity};

pub fn inches_per_meter() -> Decimal {
    Decimal::new(3937, 2) // 39.37
}

/// Product measurements as entered on the component form. Lengths in inches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Dimensions {
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub roll_width: Option<Decimal>,
    pub quantity: u32,
    pub material_rate: Option<Decimal>,
}

impl Dimensions {
    fn length(&self) -> Option<Decimal> {
        positive(self.length)
    }

    fn width(&self) -> Option<Decimal> {
        positive(self.width)
    }

    fn roll_width(&self) -> Option<Decimal> {
        positive(self.roll_width)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionInputs {
    #[serde(flatten)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub formula: ConsumptionFormula,
    #[serde(default)]
    pub manual_value: Option<String>,
    /// Formula shown alongside a manual entry. Derived from the dimensions when absent.
    #[serde(default)]
    pub base_formula: Option<ConsumptionFormula>,
}

/// Reasons a consumption figure could not be computed yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionWarning {
    LengthRequired,
    WidthRequired,
    RollWidthRequired,
    QuantityRequired,
    InvalidManualValue,
}

impl ConsumptionWarning {
    pub fn message(&self) -> &'static str {
        match self {
            Self::LengthRequired => "Length required",
            Self::WidthRequired => "Width required",
            Self::RollWidthRequired => "Roll width required",
            Self::QuantityRequired => "Quantity required",
            Self::InvalidManualValue => "Invalid manual value",
        }
    }
}

impl fmt::Display for ConsumptionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionResult {
    /// Meters. Zero whenever `warning` is set.
    pub consumption: Decimal,
    pub cost: Option<Decimal>,
    pub formula: ConsumptionFormula,
    pub base_formula: ConsumptionFormula,
    pub warning: Option<ConsumptionWarning>,
    pub explanation: String,
}

pub fn calculate(inputs: &ConsumptionInputs) -> ConsumptionResult {
    let dimensions = &inputs.dimensions;
    let base_formula = match inputs.base_formula {
        Some(ConsumptionFormula::Manual) | None => suggest_formula(
            dimensions.length,
            dimensions.width,
            dimensions.roll_width,
            ConsumptionFormula::Standard,
        ),
        Some(formula) => formula,
    };

    let computed = match inputs.formula {
        ConsumptionFormula::Standard => standard_consumption(dimensions),
        ConsumptionFormula::Linear => linear_consumption(dimensions),
        ConsumptionFormula::Manual => parse_manual_value(inputs.manual_value.as_deref()),
    };

    let (consumption, warning) = match computed {
        Ok(consumption) => (consumption, None),
        Err(warning) => (Decimal::ZERO, Some(warning)),
    };

    ConsumptionResult {
        consumption,
        cost: dimensions.material_rate.map(|rate| consumption * rate),
        formula: inputs.formula,
        base_formula: if inputs.formula == ConsumptionFormula::Manual {
            base_formula
        } else {
            inputs.formula
        },
        warning,
        explanation: explain(inputs.formula, base_formula),
    }
}

/// Picks the formula the dimensions call for, or keeps `previous` when they
/// are inconclusive.
pub fn suggest_formula(
    length: Option<Decimal>,
    width: Option<Decimal>,
    roll_width: Option<Decimal>,
    previous: ConsumptionFormula,
) -> ConsumptionFormula {
    match (positive(length), positive(width), positive(roll_width)) {
        (Some(_), Some(_), Some(_)) => ConsumptionFormula::Standard,
        (Some(_), None, None) => ConsumptionFormula::Linear,
        _ => previous,
    }
}

fn standard_consumption(dimensions: &Dimensions) -> Result<Decimal, ConsumptionWarning> {
    let width = dimensions.width().ok_or(ConsumptionWarning::WidthRequired)?;
    let roll_width = dimensions
        .roll_width()
        .ok_or(ConsumptionWarning::RollWidthRequired)?;
    let length = dimensions.length().ok_or(ConsumptionWarning::LengthRequired)?;
    let quantity = order_quantity(dimensions)?;

    Ok(round_quantity(
        ((length * width) / roll_width) / inches_per_meter() * quantity,
    ))
}

fn linear_consumption(dimensions: &Dimensions) -> Result<Decimal, ConsumptionWarning> {
    let length = dimensions.length().ok_or(ConsumptionWarning::LengthRequired)?;
    let quantity = order_quantity(dimensions)?;

    Ok(round_quantity((length * quantity) / inches_per_meter()))
}

fn parse_manual_value(raw: Option<&str>) -> Result<Decimal, ConsumptionWarning> {
    let raw = raw.map(str::trim).unwrap_or_default();
    match Decimal::from_str(raw) {
        Ok(value) if value >= Decimal::ZERO => Ok(value),
        _ => Err(ConsumptionWarning::InvalidManualValue),
    }
}

fn order_quantity(dimensions: &Dimensions) -> Result<Decimal, ConsumptionWarning> {
    if dimensions.quantity == 0 {
        return Err(ConsumptionWarning::QuantityRequired);
    }
    Ok(Decimal::from(dimensions.quantity))
}

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}

fn explain(formula: ConsumptionFormula, base_formula: ConsumptionFormula) -> String {
    match formula {
        ConsumptionFormula::Standard => {
            "((length x width) / roll width) / 39.37 x quantity".to_string()
        }
        ConsumptionFormula::Linear => "(length x quantity) / 39.37".to_string(),
        ConsumptionFormula::Manual => format!(
            "manual per-unit entry, multiplied by order quantity on submit (calculated formula: {base_formula})"
        ),
    }
}
