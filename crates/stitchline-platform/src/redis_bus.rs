use anyhow::Result;
use redis::{AsyncCommands, Client};
use serde::Serialize;

use crate::contracts::BatchSummary;

/// Batch summaries for the UI's notification toasts.
pub const INVENTORY_ADJUSTED_CHANNEL: &str = "inventory.adjusted";
pub const JOB_CARDS_DELETED_CHANNEL: &str = "job_cards.deleted";
pub const PURCHASE_REVERSALS_CHANNEL: &str = "purchases.completion_reverted";

#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }

    pub async fn publish_summary(&self, summary: &BatchSummary) -> Result<()> {
        self.publish_json(INVENTORY_ADJUSTED_CHANNEL, summary).await
    }
}
