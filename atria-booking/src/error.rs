use chrono::NaiveDate;
use uuid::Uuid;

use atria_catalog::LedgerError;
use atria_core::stay::StayError;

/// Every business-rule rejection the reservation core can produce. The HTTP
/// layer maps each variant to a status code; nothing here is thrown as an
/// opaque fault.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("insufficient inventory for room type {room_type_id} on {dates:?}")]
    InsufficientInventory {
        room_type_id: Uuid,
        dates: Vec<NaiveDate>,
    },

    #[error("hold has expired")]
    HoldExpired,

    #[error("hold not found")]
    HoldNotFound,

    #[error("quoted total {quoted_cents} no longer matches the current total {current_cents}")]
    PriceMismatch {
        quoted_cents: i32,
        current_cents: i32,
    },

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("lost a concurrent update race, retry the operation")]
    ConcurrencyConflict,

    #[error("room type not found: {0}")]
    RoomTypeNotFound(Uuid),

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error("invalid stay: {0}")]
    InvalidStay(String),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("storage failure: {0}")]
    Repository(String),
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientInventory {
                room_type_id,
                dates,
            } => BookingError::InsufficientInventory {
                room_type_id,
                dates,
            },
            LedgerError::ConcurrencyConflict { .. } => BookingError::ConcurrencyConflict,
            LedgerError::UnknownRoomType(id) => BookingError::RoomTypeNotFound(id),
            LedgerError::InvalidQuantity(q) => {
                BookingError::InvalidStay(format!("invalid quantity: {q}"))
            }
        }
    }
}

impl From<StayError> for BookingError {
    fn from(err: StayError) -> Self {
        BookingError::InvalidStay(err.to_string())
    }
}
