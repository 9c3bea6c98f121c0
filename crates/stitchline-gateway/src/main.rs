use std::{net::SocketAddr, sync::Arc};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stitchline_consumption::{
    ConsumptionInputs, ConsumptionResult, apply_manual_multiplier, calculate,
    verify_manual_multiplier,
};
use stitchline_core::JobCard;
use stitchline_inventory::{InventoryError, JobCardInventory, PurchaseInventory, TransportPlan};
use stitchline_platform::{
    BatchSummary, ManualConsumptionRequest, ManualConsumptionResponse, PgStore, RedisBus,
    ServiceConfig, connect_database,
};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    job_cards: JobCardInventory<PgStore>,
    purchases: PurchaseInventory<PgStore>,
    redis: RedisBus,
}

#[derive(Debug, Clone, Deserialize)]
struct ReverseJobCardQuery {
    /// Required once the job card row itself is gone.
    order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
struct PurchaseCompletionResponse {
    summary: BatchSummary,
    transport: TransportPlan,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "stitchline_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config).await?;
    let redis = RedisBus::connect(&config.redis_url)?;
    let store = Arc::new(PgStore::new(pool));

    let state = AppState {
        job_cards: JobCardInventory::new(Arc::clone(&store)),
        purchases: PurchaseInventory::new(store),
        redis,
    };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/consumption/calculate", post(calculate_consumption))
        .route("/orders/manual-consumption", post(process_manual_consumption))
        .route("/job-cards/{job_card_id}/consume", post(consume_job_card))
        .route("/job-cards/{job_card_id}/reverse", post(reverse_job_card))
        .route("/purchases/{purchase_id}/complete", post(complete_purchase))
        .route("/purchases/{purchase_id}/reverse", post(reverse_purchase))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn calculate_consumption(Json(payload): Json<ConsumptionInputs>) -> Json<ConsumptionResult> {
    Json(calculate(&payload))
}

async fn process_manual_consumption(
    Json(payload): Json<ManualConsumptionRequest>,
) -> Json<ManualConsumptionResponse> {
    let mut components = payload.components;
    let scaled = apply_manual_multiplier(&mut components, payload.order_quantity);
    let mismatches = verify_manual_multiplier(&components, payload.order_quantity).len();

    Json(ManualConsumptionResponse {
        components,
        scaled,
        mismatches,
    })
}

async fn consume_job_card(
    State(state): State<AppState>,
    Path(job_card_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BatchSummary>), (StatusCode, String)> {
    let job_card = state
        .job_cards
        .load_job_card(job_card_id)
        .await
        .map_err(inventory_error)?;
    let outcome = state
        .job_cards
        .consume(&job_card)
        .await
        .map_err(inventory_error)?;

    let summary = BatchSummary::from_outcome("consumption", job_card_id, &outcome, 0);
    Ok(publish_and_respond(&state, summary).await)
}

async fn reverse_job_card(
    State(state): State<AppState>,
    Path(job_card_id): Path<Uuid>,
    Query(query): Query<ReverseJobCardQuery>,
) -> Result<(StatusCode, Json<BatchSummary>), (StatusCode, String)> {
    let job_card = match query.order_id {
        Some(order_id) => JobCard {
            id: job_card_id,
            order_id,
            created_at: Utc::now(),
        },
        None => state
            .job_cards
            .load_job_card(job_card_id)
            .await
            .map_err(inventory_error)?,
    };
    let outcome = state
        .job_cards
        .reverse(&job_card)
        .await
        .map_err(inventory_error)?;

    let degraded = outcome
        .succeeded
        .iter()
        .filter(|movement| movement.is_degraded())
        .count();
    let summary = BatchSummary::from_outcome("job-card-reversal", job_card_id, &outcome, degraded);
    Ok(publish_and_respond(&state, summary).await)
}

async fn complete_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<(StatusCode, Json<PurchaseCompletionResponse>), (StatusCode, String)> {
    let completion = state
        .purchases
        .complete_with_actual_meter(purchase_id)
        .await
        .map_err(inventory_error)?;

    let summary = BatchSummary::from_outcome("purchase", purchase_id, &completion.outcome, 0);
    let (status, Json(summary)) = publish_and_respond(&state, summary).await;
    Ok((
        status,
        Json(PurchaseCompletionResponse {
            summary,
            transport: completion.transport,
        }),
    ))
}

async fn reverse_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BatchSummary>), (StatusCode, String)> {
    let outcome = state
        .purchases
        .reverse_completion(purchase_id)
        .await
        .map_err(inventory_error)?;

    let degraded = outcome
        .succeeded
        .iter()
        .filter(|movement| movement.is_degraded())
        .count();
    let summary = BatchSummary::from_outcome("purchase-reversal", purchase_id, &outcome, degraded);
    Ok(publish_and_respond(&state, summary).await)
}

async fn publish_and_respond(state: &AppState, summary: BatchSummary) -> (StatusCode, Json<BatchSummary>) {
    if let Err(err) = state.redis.publish_summary(&summary).await {
        warn!("failed to publish {} summary: {err:#}", summary.operation);
    }
    (batch_status(&summary), Json(summary))
}

fn batch_status(summary: &BatchSummary) -> StatusCode {
    if summary.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    }
}

fn inventory_error(err: InventoryError) -> (StatusCode, String) {
    let status = match &err {
        InventoryError::JobCardNotFound(_) | InventoryError::PurchaseNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        InventoryError::PurchaseStatus { .. } => StatusCode::CONFLICT,
        InventoryError::Store(_) => {
            error!("inventory store failure: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}
