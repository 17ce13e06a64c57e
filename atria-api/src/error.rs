use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use atria_booking::BookingError;

#[derive(Debug)]
pub enum AppError {
    Booking(BookingError),
    Internal(anyhow::Error),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError::Booking(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

/// Stable machine-readable code per error variant, alongside the message.
fn error_code(err: &BookingError) -> &'static str {
    match err {
        BookingError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
        BookingError::HoldExpired => "HOLD_EXPIRED",
        BookingError::HoldNotFound => "HOLD_NOT_FOUND",
        BookingError::PriceMismatch { .. } => "PRICE_MISMATCH",
        BookingError::PaymentFailed(_) => "PAYMENT_FAILED",
        BookingError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        BookingError::RoomTypeNotFound(_) => "ROOM_TYPE_NOT_FOUND",
        BookingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
        BookingError::InvalidStay(_) => "INVALID_STAY",
        BookingError::InvalidTransition { .. } => "INVALID_TRANSITION",
        BookingError::Repository(_) => "STORAGE_FAILURE",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Booking(err) => {
                let status = match &err {
                    BookingError::InsufficientInventory { .. }
                    | BookingError::HoldExpired
                    | BookingError::InvalidStay(_)
                    | BookingError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                    BookingError::HoldNotFound
                    | BookingError::RoomTypeNotFound(_)
                    | BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,
                    BookingError::PriceMismatch { .. } | BookingError::ConcurrencyConflict => {
                        StatusCode::CONFLICT
                    }
                    BookingError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
                    BookingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal Server Error: {}", err);
                    (status, "STORAGE_FAILURE", "Internal Server Error".to_string())
                } else {
                    (status, error_code(&err), err.to_string())
                }
            }
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));
        (status, body).into_response()
    }
}
