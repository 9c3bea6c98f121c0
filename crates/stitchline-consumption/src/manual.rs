use rust_decimal::Decimal;
use serde::Serialize;
use stitchline_core::{Component, round_quantity};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Scales manual (per-unit) consumption figures to the order quantity.
///
/// Standard and linear figures already include the quantity and pass through.
/// `original_consumption` is captured on first use and is the only input to
/// the multiplication afterwards, so calling this again never compounds.
/// A non-positive `order_quantity` leaves every component untouched.
/// Returns how many components were scaled.
pub fn apply_manual_multiplier(components: &mut [Component], order_quantity: i64) -> usize {
    if order_quantity <= 0 {
        return 0;
    }
    let multiplier = Decimal::from(order_quantity);

    let mut scaled = 0;
    for component in components.iter_mut().filter(|c| c.is_manual_consumption()) {
        let original = *component
            .original_consumption
            .get_or_insert(component.consumption);
        component.consumption = round_quantity(original * multiplier);
        scaled += 1;
    }
    scaled
}

/// A manual component whose stored figure disagrees with its captured
/// per-unit value times the order quantity. Always a processing bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("component {component_id}: stored consumption {stored} does not match expected {expected:?}")]
pub struct ScalingMismatch {
    pub component_id: Uuid,
    pub stored: Decimal,
    /// `None` when the component was never run through the multiplier.
    pub expected: Option<Decimal>,
}

pub fn verify_manual_multiplier(components: &[Component], order_quantity: i64) -> Vec<ScalingMismatch> {
    if order_quantity <= 0 {
        return Vec::new();
    }
    let tolerance = Decimal::new(1, 3);
    let multiplier = Decimal::from(order_quantity);

    let mismatches: Vec<ScalingMismatch> = components
        .iter()
        .filter(|c| c.is_manual_consumption())
        .filter_map(|component| {
            let expected = component.original_consumption.map(|o| o * multiplier);
            match expected {
                Some(expected) if (expected - component.consumption).abs() <= tolerance => None,
                _ => Some(ScalingMismatch {
                    component_id: component.id,
                    stored: component.consumption,
                    expected,
                }),
            }
        })
        .collect();

    for mismatch in &mismatches {
        error!("manual consumption scaling check failed: {mismatch}");
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use stitchline_core::{ComponentType, ConsumptionFormula};

    use super::*;

    fn component(formula: ConsumptionFormula, consumption: Decimal) -> Component {
        Component {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            component_type: ComponentType::Handle,
            length: Some(Decimal::from(12)),
            width: None,
            roll_width: None,
            quantity: 5,
            material_id: Some(Uuid::new_v4()),
            material_rate: None,
            formula,
            consumption,
            original_consumption: None,
        }
    }

    #[test]
    fn manual_consumption_is_multiplied_once() {
        let mut components = vec![component(ConsumptionFormula::Manual, Decimal::new(25, 1))];

        assert_eq!(apply_manual_multiplier(&mut components, 5), 1);
        assert_eq!(components[0].consumption, Decimal::new(125, 1));
        assert_eq!(components[0].original_consumption, Some(Decimal::new(25, 1)));

        apply_manual_multiplier(&mut components, 5);
        assert_eq!(components[0].consumption, Decimal::new(125, 1));
        assert_eq!(components[0].original_consumption, Some(Decimal::new(25, 1)));
    }

    #[test]
    fn new_order_quantity_rescales_from_original() {
        let mut components = vec![component(ConsumptionFormula::Manual, Decimal::new(25, 1))];
        apply_manual_multiplier(&mut components, 5);
        apply_manual_multiplier(&mut components, 2);

        assert_eq!(components[0].consumption, Decimal::from(5));
    }

    #[test]
    fn formula_components_pass_through() {
        let before = component(ConsumptionFormula::Linear, Decimal::new(36576, 4));
        let mut components = vec![before.clone()];

        assert_eq!(apply_manual_multiplier(&mut components, 5), 0);
        assert_eq!(components[0], before);
    }

    #[test]
    fn non_positive_order_quantity_is_a_no_op() {
        let before = vec![component(ConsumptionFormula::Manual, Decimal::new(25, 1))];
        let mut components = before.clone();

        assert_eq!(apply_manual_multiplier(&mut components, 0), 0);
        assert_eq!(apply_manual_multiplier(&mut components, -3), 0);
        assert_eq!(components, before);
    }

    #[test]
    fn verification_flags_stale_or_unprocessed_components() {
        let mut components = vec![
            component(ConsumptionFormula::Manual, Decimal::new(25, 1)),
            component(ConsumptionFormula::Manual, Decimal::from(4)),
        ];
        apply_manual_multiplier(&mut components[..1], 5);
        assert!(verify_manual_multiplier(&components[..1], 5).is_empty());

        let mismatches = verify_manual_multiplier(&components, 5);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].component_id, components[1].id);
        assert_eq!(mismatches[0].expected, None);

        components[0].consumption = Decimal::new(12502, 3);
        let mismatches = verify_manual_multiplier(&components[..1], 5);
        assert_eq!(mismatches[0].expected, Some(Decimal::new(125, 1)));
    }

    #[test]
    fn verification_tolerates_rounding_noise() {
        let mut manual = component(ConsumptionFormula::Manual, Decimal::new(12505, 4));
        manual.original_consumption = Some(Decimal::new(25, 1));
        assert!(verify_manual_multiplier(&[manual], 5).is_empty());
    }
}
