use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use atria_booking::{BookingError, HoldLine, HoldSummary};
use atria_catalog::pricing::{Extra, MealPlan, PriceBreakdown};
use atria_catalog::room::RoomDirectory;
use atria_core::stay::StayRange;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoomLineRequest {
    pub room_type_id: Uuid,
    pub quantity: i32,
    #[serde(default = "default_adults")]
    pub adults: i32,
    #[serde(default)]
    pub meal_plan: Option<MealPlan>,
    #[serde(default)]
    pub extras: Vec<Extra>,
}

fn default_adults() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct StayRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<RoomLineRequest>,
}

#[derive(Debug, Serialize)]
struct HoldResponse {
    token: Uuid,
    hotel_id: Uuid,
    expires_at: DateTime<Utc>,
    quote: PriceBreakdown,
}

impl From<HoldSummary> for HoldResponse {
    fn from(summary: HoldSummary) -> Self {
        Self {
            token: summary.token,
            hotel_id: summary.hotel_id,
            expires_at: summary.expires_at,
            quote: summary.quote,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/calculate", post(calculate))
        .route("/v1/bookings/init", post(init_hold))
        .route(
            "/v1/bookings/hold/{token}",
            get(get_hold).delete(release_hold),
        )
        .route("/v1/bookings/hold/{token}/extend", post(extend_hold))
        .route("/v1/hotels/{slug}/stream", get(stream_events))
}

fn hold_lines(req: StayRequest) -> Result<Vec<HoldLine>, AppError> {
    let stay = StayRange::new(req.check_in, req.check_out).map_err(BookingError::from)?;
    Ok(req
        .rooms
        .into_iter()
        .map(|r| HoldLine {
            room_type_id: r.room_type_id,
            quantity: r.quantity,
            stay,
            adults: r.adults,
            meal_plan: r.meal_plan.unwrap_or(MealPlan::RoomOnly),
            extras: r.extras,
        })
        .collect())
}

/// POST /v1/bookings/calculate
/// Price quote, no side effects
async fn calculate(
    State(state): State<AppState>,
    Json(req): Json<StayRequest>,
) -> Result<Json<PriceBreakdown>, AppError> {
    let lines = hold_lines(req)?;
    let quote = state.holds.quote(&lines).await?;
    Ok(Json(quote))
}

/// POST /v1/bookings/init
/// Reserve inventory behind a short-lived hold
async fn init_hold(
    State(state): State<AppState>,
    Json(req): Json<StayRequest>,
) -> Result<Json<HoldResponse>, AppError> {
    let lines = hold_lines(req)?;
    let summary = state.holds.create(lines).await?;
    Ok(Json(summary.into()))
}

/// GET /v1/bookings/hold/{token}
async fn get_hold(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<HoldSummary>, AppError> {
    let summary = state
        .holds
        .summary(token)
        .await
        .ok_or(BookingError::HoldNotFound)?;
    Ok(Json(summary))
}

/// POST /v1/bookings/hold/{token}/extend
async fn extend_hold(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let expires_at = state.holds.extend(token).await?;
    Ok(Json(json!({
        "token": token,
        "expires_at": expires_at,
    })))
}

/// DELETE /v1/bookings/hold/{token}
/// Idempotent: releasing an unknown or already-terminal hold is still a 200
async fn release_hold(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.holds.release(token).await?;
    Ok(Json(json!({ "status": "RELEASED" })))
}

/// GET /v1/hotels/{slug}/stream
/// SSE feed of hold/booking events for one hotel
async fn stream_events(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, axum::http::StatusCode> {
    let hotel = state
        .catalog
        .get_hotel_by_slug(&slug)
        .await
        .map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(axum::http::StatusCode::NOT_FOUND)?;
    let hotel_id = hotel.id;
    let rx = state.events_tx.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            match result {
                Ok(event) if event.hotel_id() == hotel_id => Some(Ok(Event::default()
                    .event("reservation")
                    .data(serde_json::to_string(&event).unwrap()))),
                _ => None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
