use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use atria_booking::BookingError;
use atria_core::payment::{GatewayEvent, GatewayEventKind};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/bookings/webhook/{gateway}", post(handle_webhook))
}

/// POST /v1/bookings/webhook/{gateway}
/// Receive payment status updates from the gateway
async fn handle_webhook(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    Json(payload): Json<GatewayWebhook>,
) -> Result<StatusCode, AppError> {
    tracing::info!(
        "Received webhook: {} for intent {}",
        payload.type_,
        payload.data.object.id
    );

    let kind = match payload.type_.as_str() {
        "payment_intent.succeeded" => GatewayEventKind::PaymentSucceeded,
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            GatewayEventKind::PaymentFailed
        }
        "charge.refunded" => GatewayEventKind::PaymentRefunded,
        other => {
            tracing::debug!("ignoring webhook type {other}");
            return Ok(StatusCode::OK);
        }
    };

    let event = GatewayEvent {
        gateway,
        kind,
        intent_id: payload.data.object.id,
        amount_cents: payload.data.object.amount,
    };

    match state.orchestrator.handle_gateway_event(event).await {
        Ok(_) => Ok(StatusCode::OK),
        // Acknowledge unknown intents so the gateway stops re-delivering.
        Err(BookingError::BookingNotFound(id)) => {
            tracing::warn!("webhook for unknown intent {id}");
            Ok(StatusCode::OK)
        }
        Err(e) => Err(e.into()),
    }
}
