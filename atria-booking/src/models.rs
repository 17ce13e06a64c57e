use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atria_catalog::ledger::LedgerLine;
use atria_catalog::pricing::{Extra, LineBreakdown, MealPlan, PriceBreakdown};
use atria_core::guest::GuestDetails;
use atria_core::stay::StayRange;

/// One requested room line inside a hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldLine {
    pub room_type_id: Uuid,
    pub quantity: i32,
    pub stay: StayRange,
    /// Guests per room.
    pub adults: i32,
    pub meal_plan: MealPlan,
    pub extras: Vec<Extra>,
}

impl HoldLine {
    pub fn ledger_line(&self) -> LedgerLine {
        LedgerLine {
            room_type_id: self.room_type_id,
            stay: self.stay,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    Active,
    Expired,
    Released,
    Consumed,
}

impl HoldStatus {
    pub fn is_terminal(&self) -> bool {
        *self != HoldStatus::Active
    }
}

/// Time-boxed exclusive reservation of inventory pending checkout. Owns its
/// inventory delta until it is consumed into a booking or leaves `Active`,
/// at which point the delta is released exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct Hold {
    pub token: Uuid,
    pub hotel_id: Uuid,
    pub lines: Vec<HoldLine>,
    /// Server-side quote captured at hold creation.
    pub quote: PriceBreakdown,
    pub status: HoldStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    CheckedIn,
    CheckedOut,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "PENDING_PAYMENT",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::CheckedOut => "CHECKED_OUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// A booking line with its locked-in price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingLine {
    pub room_type_id: Uuid,
    pub quantity: i32,
    pub stay: StayRange,
    pub adults: i32,
    pub meal_plan: MealPlan,
    pub extras: Vec<Extra>,
    pub price: LineBreakdown,
}

/// Durable reservation record. Once created it is the sole owner of the
/// permanent inventory debit; the originating hold is marked consumed in the
/// same critical section.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub code: String,
    pub hotel_id: Uuid,
    pub guest: GuestDetails,
    pub lines: Vec<BookingLine>,
    /// Price locked at booking creation.
    pub quote: PriceBreakdown,
    pub status: BookingStatus,
    pub payment_state: PaymentState,
    pub payment_intent_id: Option<String>,
    pub hold_token: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Human-readable booking reference, e.g. `ATR-7KQ2MX`. The alphabet skips
/// 0/O/1/I to keep codes phone-friendly.
pub fn generate_booking_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("ATR-{suffix}")
}
