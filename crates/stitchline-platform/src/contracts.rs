use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stitchline_core::{BatchOutcome, Component, ItemFailure};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualConsumptionRequest {
    pub components: Vec<Component>,
    pub order_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualConsumptionResponse {
    pub components: Vec<Component>,
    pub scaled: usize,
    pub mismatches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCardDeletedEvent {
    pub job_card_id: Uuid,
    pub order_id: Uuid,
    #[serde(default = "Utc::now")]
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReversalRequestedEvent {
    pub purchase_id: Uuid,
}

/// What the UI toasts after a batch: counts first, messages second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub operation: String,
    pub reference_id: Uuid,
    pub success: bool,
    pub succeeded: usize,
    pub degraded: usize,
    pub failed: usize,
    pub message: Option<String>,
    pub failures: Vec<ItemFailure>,
}

impl BatchSummary {
    pub fn from_outcome<T>(
        operation: &str,
        reference_id: Uuid,
        outcome: &BatchOutcome<T>,
        degraded: usize,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            reference_id,
            success: outcome.success(),
            succeeded: outcome.succeeded_count(),
            degraded,
            failed: outcome.failed_count(),
            message: outcome.error_message(),
            failures: outcome.failures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_carries_counts_and_joined_message() {
        let mut outcome = BatchOutcome::new();
        outcome.record_success(());
        outcome.record_success(());
        outcome.record_failure("Webbing", "connection reset");

        let summary = BatchSummary::from_outcome("job-card-reversal", Uuid::nil(), &outcome, 1);

        assert!(summary.success);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.message.as_deref(), Some("Webbing: connection reset"));
    }

    #[test]
    fn deleted_event_defaults_timestamp() {
        let event: JobCardDeletedEvent = serde_json::from_str(&format!(
            r#"{{"job_card_id":"{}","order_id":"{}"}}"#,
            Uuid::nil(),
            Uuid::nil()
        ))
        .expect("parse");
        assert_eq!(event.job_card_id, Uuid::nil());
    }
}
