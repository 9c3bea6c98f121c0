pub mod error;
mod history;
pub mod job_card;
pub mod purchase;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use error::InventoryError;
pub use job_card::{ComponentMovement, JobCardInventory};
pub use purchase::{PurchaseCompletion, PurchaseInventory, PurchaseMovement};
pub use transport::{TransportAllocation, TransportPlan, distribute_transport};
