use rust_decimal::Decimal;
use stitchline_core::{Component, ConsumptionFormula};

use crate::formula::{ConsumptionInputs, ConsumptionResult, Dimensions, calculate, suggest_formula};

/// Editing state of one component's consumption while its form is open.
///
/// Tracks the calculated formula separately from manual mode so leaving
/// manual mode always falls back to a freshly computed figure. The formula
/// heuristic only runs while the session is neither manual nor pinned.
#[derive(Debug, Clone)]
pub struct ConsumptionSession {
    dimensions: Dimensions,
    base_formula: ConsumptionFormula,
    manual: bool,
    manual_value: String,
    pinned: bool,
    last_calculated: Decimal,
}

impl Default for ConsumptionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumptionSession {
    pub fn new() -> Self {
        Self {
            dimensions: Dimensions::default(),
            base_formula: ConsumptionFormula::Standard,
            manual: false,
            manual_value: String::new(),
            pinned: false,
            last_calculated: Decimal::ZERO,
        }
    }

    /// Opens an existing component for editing. Its saved formula is pinned.
    pub fn from_component(component: &Component) -> Self {
        let dimensions = Dimensions {
            length: component.length,
            width: component.width,
            roll_width: component.roll_width,
            quantity: component.quantity,
            material_rate: component.material_rate,
        };

        let mut session = Self {
            dimensions,
            ..Self::new()
        };

        if component.is_manual_consumption() {
            session.base_formula = suggest_formula(
                component.length,
                component.width,
                component.roll_width,
                ConsumptionFormula::Standard,
            );
            session.manual = true;
            // consumption may already carry the order multiplier
            let per_unit = component
                .original_consumption
                .unwrap_or(component.consumption);
            session.manual_value = per_unit.normalize().to_string();
        } else {
            session.base_formula = component.formula;
        }
        session.pinned = true;
        session.recalculate();
        session
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn base_formula(&self) -> ConsumptionFormula {
        self.base_formula
    }

    pub fn formula(&self) -> ConsumptionFormula {
        if self.manual {
            ConsumptionFormula::Manual
        } else {
            self.base_formula
        }
    }

    pub fn manual_value(&self) -> &str {
        &self.manual_value
    }

    pub fn set_dimensions(&mut self, dimensions: Dimensions) -> ConsumptionResult {
        self.dimensions = dimensions;
        if !self.manual && !self.pinned {
            self.base_formula = suggest_formula(
                self.dimensions.length,
                self.dimensions.width,
                self.dimensions.roll_width,
                self.base_formula,
            );
        }
        self.recalculate()
    }

    /// An explicit choice by the operator; the heuristic stops overriding it.
    pub fn select_formula(&mut self, formula: ConsumptionFormula) -> ConsumptionResult {
        if formula == ConsumptionFormula::Manual {
            return self.enter_manual();
        }
        self.pinned = true;
        self.manual = false;
        self.base_formula = formula;
        self.recalculate()
    }

    /// Hands formula choice back to the dimension heuristic.
    pub fn unpin(&mut self) {
        self.pinned = false;
    }

    /// Switches to manual entry seeded with the last calculated figure.
    pub fn enter_manual(&mut self) -> ConsumptionResult {
        if !self.manual {
            self.manual_value = self.last_calculated.normalize().to_string();
            self.manual = true;
        }
        self.snapshot()
    }

    /// Leaves manual entry and recomputes with the base formula.
    pub fn exit_manual(&mut self) -> ConsumptionResult {
        self.manual = false;
        self.recalculate()
    }

    pub fn set_manual_value(&mut self, raw: impl Into<String>) -> ConsumptionResult {
        self.manual_value = raw.into();
        self.snapshot()
    }

    pub fn snapshot(&self) -> ConsumptionResult {
        calculate(&self.inputs(self.formula()))
    }

    /// Writes the form state back into a component. A manual figure is
    /// per-unit again, so any captured original is cleared for the order
    /// multiplier to pick up.
    pub fn apply_to(&self, component: &mut Component) -> ConsumptionResult {
        let result = self.snapshot();
        component.length = self.dimensions.length;
        component.width = self.dimensions.width;
        component.roll_width = self.dimensions.roll_width;
        component.quantity = self.dimensions.quantity;
        component.material_rate = self.dimensions.material_rate;
        component.formula = self.formula();
        component.consumption = result.consumption;
        component.original_consumption = None;
        result
    }

    fn recalculate(&mut self) -> ConsumptionResult {
        let calculated = calculate(&self.inputs(self.base_formula));
        self.last_calculated = calculated.consumption;
        if self.manual {
            self.snapshot()
        } else {
            calculated
        }
    }

    fn inputs(&self, formula: ConsumptionFormula) -> ConsumptionInputs {
        ConsumptionInputs {
            dimensions: self.dimensions.clone(),
            formula,
            manual_value: (formula == ConsumptionFormula::Manual).then(|| self.manual_value.clone()),
            base_formula: Some(self.base_formula),
        }
    }
}

#[cfg(test)]
mod tests {
    use stitchline_core::ComponentType;
    use uuid::Uuid;

    use super::*;

    fn standard_dimensions() -> Dimensions {
        Dimensions {
            length: Some(Decimal::from(20)),
            width: Some(Decimal::from(15)),
            roll_width: Some(Decimal::from(60)),
            quantity: 10,
            material_rate: None,
        }
    }

    fn component(formula: ConsumptionFormula) -> Component {
        Component {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            component_type: ComponentType::Part,
            length: Some(Decimal::from(20)),
            width: None,
            roll_width: None,
            quantity: 4,
            material_id: None,
            material_rate: None,
            formula,
            consumption: Decimal::new(25, 1),
            original_consumption: None,
        }
    }

    #[test]
    fn heuristic_tracks_dimensions_until_pinned() {
        let mut session = ConsumptionSession::new();

        let result = session.set_dimensions(Dimensions {
            length: Some(Decimal::from(36)),
            quantity: 4,
            ..Dimensions::default()
        });
        assert_eq!(result.formula, ConsumptionFormula::Linear);

        let result = session.set_dimensions(standard_dimensions());
        assert_eq!(result.formula, ConsumptionFormula::Standard);
        assert_eq!(result.consumption, Decimal::new(12700, 4));

        session.select_formula(ConsumptionFormula::Linear);
        let result = session.set_dimensions(standard_dimensions());
        assert_eq!(result.formula, ConsumptionFormula::Linear);
    }

    #[test]
    fn unpinning_lets_the_heuristic_run_again() {
        let mut session = ConsumptionSession::new();
        session.select_formula(ConsumptionFormula::Linear);
        assert_eq!(
            session.set_dimensions(standard_dimensions()).formula,
            ConsumptionFormula::Linear
        );

        session.unpin();
        assert!(!session.is_pinned());
        let result = session.set_dimensions(standard_dimensions());
        assert_eq!(result.formula, ConsumptionFormula::Standard);
        assert_eq!(result.consumption, Decimal::new(12700, 4));
    }

    #[test]
    fn entering_manual_keeps_last_calculated_value() {
        let mut session = ConsumptionSession::new();
        session.set_dimensions(standard_dimensions());

        let result = session.enter_manual();
        assert!(session.is_manual());
        assert_eq!(session.manual_value(), "1.27");
        assert_eq!(result.consumption, Decimal::new(127, 2));
        assert_eq!(result.formula, ConsumptionFormula::Manual);
        assert_eq!(result.base_formula, ConsumptionFormula::Standard);
    }

    #[test]
    fn exiting_manual_recomputes_with_base_formula() {
        let mut session = ConsumptionSession::new();
        session.set_dimensions(standard_dimensions());
        session.enter_manual();
        session.set_manual_value("9");

        let result = session.exit_manual();
        assert!(!session.is_manual());
        assert_eq!(result.formula, ConsumptionFormula::Standard);
        assert_eq!(result.consumption, Decimal::new(12700, 4));
    }

    #[test]
    fn dimension_changes_in_manual_mode_do_not_switch_formula() {
        let mut session = ConsumptionSession::new();
        session.set_dimensions(standard_dimensions());
        session.enter_manual();
        session.set_manual_value("3.2");

        let result = session.set_dimensions(Dimensions {
            length: Some(Decimal::from(36)),
            quantity: 4,
            ..Dimensions::default()
        });
        assert_eq!(result.formula, ConsumptionFormula::Manual);
        assert_eq!(result.consumption, Decimal::new(32, 1));
        assert_eq!(session.base_formula(), ConsumptionFormula::Standard);
    }

    #[test]
    fn loading_a_saved_component_pins_its_formula() {
        let mut saved = component(ConsumptionFormula::Standard);
        saved.width = Some(Decimal::from(15));
        saved.roll_width = None;
        let mut session = ConsumptionSession::from_component(&saved);
        assert!(session.is_pinned());

        // length only would suggest linear
        let result = session.set_dimensions(Dimensions {
            length: Some(Decimal::from(20)),
            quantity: 4,
            ..Dimensions::default()
        });
        assert_eq!(result.formula, ConsumptionFormula::Standard);
    }

    #[test]
    fn loading_a_scaled_manual_component_uses_per_unit_figure() {
        let mut saved = component(ConsumptionFormula::Manual);
        saved.original_consumption = Some(Decimal::new(25, 1));
        saved.consumption = Decimal::new(125, 1);

        let session = ConsumptionSession::from_component(&saved);
        assert!(session.is_manual());
        assert_eq!(session.manual_value(), "2.5");
        assert_eq!(session.base_formula(), ConsumptionFormula::Linear);
    }

    #[test]
    fn apply_resets_original_consumption_for_manual_entries() {
        let mut saved = component(ConsumptionFormula::Manual);
        saved.original_consumption = Some(Decimal::new(25, 1));
        saved.consumption = Decimal::new(125, 1);

        let mut session = ConsumptionSession::from_component(&saved);
        session.set_manual_value("3");
        session.apply_to(&mut saved);

        assert_eq!(saved.consumption, Decimal::from(3));
        assert_eq!(saved.original_consumption, None);
        assert!(saved.is_manual_consumption());
    }
}
