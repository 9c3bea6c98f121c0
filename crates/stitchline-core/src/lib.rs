pub mod batch;
pub mod error;
pub mod ledger;
pub mod models;
pub mod storage;

pub use batch::{BatchFailure, BatchOutcome, ItemFailure};
pub use error::{StoreError, StoreResult};
pub use ledger::{
    ComponentMetadata, LedgerEntry, LedgerMetadata, LedgerQuery, LedgerReference,
    PendingAdjustment, PurchaseItemMetadata, QuantityChange, ReferenceType, RestoreSource,
    TransactionType,
};
pub use models::{
    Component, ComponentType, ConsumptionFormula, InventoryItem, JobCard, LinkedComponent,
    ParseEnumError, Purchase, PurchaseItem, PurchaseStatus, round_quantity,
};
pub use storage::{InventoryStore, LedgerStore, ProductionStore, PurchaseStore};
