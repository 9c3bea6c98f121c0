use stitchline_core::{PurchaseStatus, StoreError};
use thiserror::Error;
use uuid::Uuid;

/// Preconditions that stop a batch before any inventory moves.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("job card {0} not found")]
    JobCardNotFound(Uuid),
    #[error("purchase {0} not found")]
    PurchaseNotFound(Uuid),
    #[error("purchase {id} is {actual}, expected {expected}")]
    PurchaseStatus {
        id: Uuid,
        actual: &'static str,
        expected: &'static str,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InventoryError {
    pub(crate) fn purchase_status(id: Uuid, actual: PurchaseStatus, expected: PurchaseStatus) -> Self {
        Self::PurchaseStatus {
            id,
            actual: actual.as_str(),
            expected: expected.as_str(),
        }
    }
}
