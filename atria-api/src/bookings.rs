use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atria_booking::{
    Booking, BookingDetails, BookingStatus, PaymentState, RefundInfo,
};
use atria_catalog::pricing::{MealPlan, PriceBreakdown};
use atria_core::guest::GuestDetails;
use atria_shared::pii::Masked;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GuestRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub hold_token: Uuid,
    pub guest: GuestRequest,
    /// Client-side total, cross-checked against the server-side price.
    pub expected_total_cents: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PayBookingRequest {
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingLineResponse {
    pub room_type_id: Uuid,
    pub quantity: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub meal_plan: MealPlan,
    pub line_total_cents: i32,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub code: String,
    pub hotel_id: Uuid,
    pub guest_name: String,
    pub status: BookingStatus,
    pub payment_status: PaymentState,
    pub lines: Vec<BookingLineResponse>,
    pub quote: PriceBreakdown,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            code: booking.code,
            hotel_id: booking.hotel_id,
            guest_name: booking.guest.full_name(),
            status: booking.status,
            payment_status: booking.payment_state,
            lines: booking
                .lines
                .iter()
                .map(|l| BookingLineResponse {
                    room_type_id: l.room_type_id,
                    quantity: l.quantity,
                    check_in: l.stay.check_in(),
                    check_out: l.stay.check_out(),
                    adults: l.adults,
                    meal_plan: l.meal_plan,
                    line_total_cents: l.price.line_total_cents,
                })
                .collect(),
            quote: booking.quote,
            created_at: booking.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    pub booking: BookingResponse,
    pub refund: RefundInfo,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{code}", get(get_booking))
        .route("/v1/bookings/{code}/cancel", post(cancel_booking))
        .route("/v1/bookings/{code}/pay", post(pay_booking))
        .route("/v1/bookings/{code}/check-in", post(check_in))
        .route("/v1/bookings/{code}/check-out", post(check_out))
}

/// POST /v1/bookings
/// Convert a live hold into a PENDING_PAYMENT booking
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let details = BookingDetails {
        guest: GuestDetails {
            first_name: req.guest.first_name,
            last_name: req.guest.last_name,
            email: Masked(req.guest.email),
            phone: req.guest.phone,
        },
        expected_total_cents: req.expected_total_cents,
    };
    let booking = state
        .orchestrator
        .create_booking_from_hold(req.hold_token, details)
        .await?;
    Ok(Json(booking.into()))
}

/// GET /v1/bookings/{code}
async fn get_booking(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .orchestrator
        .get_booking(&code)
        .await
        .ok_or(atria_booking::BookingError::BookingNotFound(code))?;
    Ok(Json(booking.into()))
}

/// POST /v1/bookings/{code}/pay
async fn pay_booking(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<PayBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    if let Some(method) = &req.payment_method {
        tracing::info!(code = %code, method = %method, "processing payment");
    }
    let booking = state
        .orchestrator
        .pay_booking(&code, req.payment_reference)
        .await?;
    Ok(Json(booking.into()))
}

/// POST /v1/bookings/{code}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Option<Json<CancelBookingRequest>>,
) -> Result<Json<CancelBookingResponse>, AppError> {
    let reason = payload.and_then(|Json(req)| req.reason);
    let (booking, refund) = state.orchestrator.cancel_booking(&code, reason).await?;
    Ok(Json(CancelBookingResponse {
        booking: booking.into(),
        refund,
    }))
}

/// POST /v1/bookings/{code}/check-in
async fn check_in(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.orchestrator.check_in(&code).await?;
    Ok(Json(booking.into()))
}

/// POST /v1/bookings/{code}/check-out
async fn check_out(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.orchestrator.check_out(&code).await?;
    Ok(Json(booking.into()))
}
