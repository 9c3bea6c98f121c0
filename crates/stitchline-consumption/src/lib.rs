pub mod formula;
pub mod manual;
pub mod session;

pub use formula::{
    ConsumptionInputs, ConsumptionResult, ConsumptionWarning, Dimensions, calculate,
    inches_per_meter, suggest_formula,
};
pub use manual::{ScalingMismatch, apply_manual_multiplier, verify_manual_multiplier};
pub use session::ConsumptionSession;
