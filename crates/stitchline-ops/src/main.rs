use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use redis::Msg;
use stitchline_core::JobCard;
use stitchline_inventory::{JobCardInventory, PurchaseInventory};
use stitchline_platform::{
    BatchSummary, JOB_CARDS_DELETED_CHANNEL, JobCardDeletedEvent, PURCHASE_REVERSALS_CHANNEL,
    PgStore, PurchaseReversalRequestedEvent, RedisBus, ServiceConfig, connect_database,
};
use tracing::{error, info, warn};

struct Worker {
    job_cards: JobCardInventory<PgStore>,
    purchases: PurchaseInventory<PgStore>,
    redis: RedisBus,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "stitchline_ops=info".to_string()),
        )
        .init();

    let config = ServiceConfig::worker_from_env()?;
    let pool = connect_database(&config).await?;
    let redis = RedisBus::connect(&config.redis_url)?;
    let store = Arc::new(PgStore::new(pool));

    let mut pubsub = redis.client().get_async_pubsub().await?;
    pubsub.subscribe(JOB_CARDS_DELETED_CHANNEL).await?;
    pubsub.subscribe(PURCHASE_REVERSALS_CHANNEL).await?;

    let worker = Worker {
        job_cards: JobCardInventory::new(Arc::clone(&store)),
        purchases: PurchaseInventory::new(store),
        redis,
    };
    let mut messages = pubsub.on_message();

    info!(
        "ops worker subscribed to {} and {}",
        JOB_CARDS_DELETED_CHANNEL, PURCHASE_REVERSALS_CHANNEL
    );

    loop {
        let msg = messages
            .next()
            .await
            .context("reversal stream ended unexpectedly")?;
        if let Err(err) = worker.handle_message(msg).await {
            error!("failed to process message: {err:#}");
        }
    }
}

/// A reversal asked for over Redis.
#[derive(Debug)]
enum ReversalRequest {
    JobCard(JobCardDeletedEvent),
    Purchase(PurchaseReversalRequestedEvent),
}

/// `Ok(None)` for channels the worker does not handle.
fn parse_request(channel: &str, payload: &str) -> Result<Option<ReversalRequest>> {
    let request = match channel {
        JOB_CARDS_DELETED_CHANNEL => ReversalRequest::JobCard(
            serde_json::from_str(payload).with_context(|| format!("invalid {channel} payload"))?,
        ),
        PURCHASE_REVERSALS_CHANNEL => ReversalRequest::Purchase(
            serde_json::from_str(payload).with_context(|| format!("invalid {channel} payload"))?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(request))
}

impl Worker {
    async fn handle_message(&self, msg: Msg) -> Result<()> {
        let channel = msg.get_channel_name();
        let payload: String = msg.get_payload()?;

        let summary = match parse_request(channel, &payload)? {
            Some(ReversalRequest::JobCard(event)) => self.reverse_job_card(event).await?,
            Some(ReversalRequest::Purchase(event)) => self.reverse_purchase(event).await?,
            None => {
                warn!("ignoring message on unexpected channel {channel}");
                return Ok(());
            }
        };

        if !summary.success {
            error!(
                "{} {} failed: {}",
                summary.operation,
                summary.reference_id,
                summary.message.as_deref().unwrap_or("no items restored")
            );
        }
        self.redis.publish_summary(&summary).await
    }

    async fn reverse_job_card(&self, event: JobCardDeletedEvent) -> Result<BatchSummary> {
        // The row is already gone by the time the event arrives.
        let job_card = JobCard {
            id: event.job_card_id,
            order_id: event.order_id,
            created_at: event.deleted_at,
        };
        let outcome = self.job_cards.reverse(&job_card).await?;
        let degraded = outcome
            .succeeded
            .iter()
            .filter(|movement| movement.is_degraded())
            .count();

        info!(
            "job card {} reversed: {} restored, {} failed",
            event.job_card_id,
            outcome.succeeded_count(),
            outcome.failed_count()
        );
        Ok(BatchSummary::from_outcome(
            "job-card-reversal",
            event.job_card_id,
            &outcome,
            degraded,
        ))
    }

    async fn reverse_purchase(&self, event: PurchaseReversalRequestedEvent) -> Result<BatchSummary> {
        let outcome = self.purchases.reverse_completion(event.purchase_id).await?;
        let degraded = outcome
            .succeeded
            .iter()
            .filter(|movement| movement.is_degraded())
            .count();

        info!(
            "purchase {} reverted: {} restored, {} failed",
            event.purchase_id,
            outcome.succeeded_count(),
            outcome.failed_count()
        );
        Ok(BatchSummary::from_outcome(
            "purchase-reversal",
            event.purchase_id,
            &outcome,
            degraded,
        ))
    }
}

#[cfg(test)]
mod tests {
    use stitchline_platform::INVENTORY_ADJUSTED_CHANNEL;

    use super::*;

    const NIL: &str = "00000000-0000-0000-0000-000000000000";

    #[test]
    fn job_card_deletions_parse_into_reversals() {
        let payload = format!(r#"{{"job_card_id":"{NIL}","order_id":"{NIL}"}}"#);

        let request = parse_request(JOB_CARDS_DELETED_CHANNEL, &payload).expect("parse");
        let Some(ReversalRequest::JobCard(event)) = request else {
            panic!("job card request expected");
        };
        assert!(event.job_card_id.is_nil());
        assert!(event.order_id.is_nil());
    }

    #[test]
    fn purchase_reversals_parse_into_reversals() {
        let payload = format!(r#"{{"purchase_id":"{NIL}"}}"#);

        let request = parse_request(PURCHASE_REVERSALS_CHANNEL, &payload).expect("parse");
        assert!(matches!(
            request,
            Some(ReversalRequest::Purchase(event)) if event.purchase_id.is_nil()
        ));
    }

    #[test]
    fn other_channels_are_ignored() {
        let request = parse_request(INVENTORY_ADJUSTED_CHANNEL, "{}").expect("parse");
        assert!(request.is_none());
    }

    #[test]
    fn malformed_payload_names_its_channel() {
        let err = parse_request(PURCHASE_REVERSALS_CHANNEL, r#"{"purchase_id":42}"#)
            .expect_err("malformed");
        assert_eq!(
            err.to_string(),
            format!("invalid {PURCHASE_REVERSALS_CHANNEL} payload")
        );

        assert!(parse_request(JOB_CARDS_DELETED_CHANNEL, "not json").is_err());
    }
}
