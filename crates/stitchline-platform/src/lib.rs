pub mod config;
pub mod contracts;
pub mod db;
pub mod pg_store;
pub mod redis_bus;

pub use config::ServiceConfig;
pub use contracts::{
    BatchSummary, JobCardDeletedEvent, ManualConsumptionRequest, ManualConsumptionResponse,
    PurchaseReversalRequestedEvent,
};
pub use db::connect_database;
pub use pg_store::PgStore;
pub use redis_bus::{
    INVENTORY_ADJUSTED_CHANNEL, JOB_CARDS_DELETED_CHANNEL, PURCHASE_REVERSALS_CHANNEL, RedisBus,
};
