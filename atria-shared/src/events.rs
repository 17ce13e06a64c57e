use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events published on the in-process broadcast bus and fanned out to
/// SSE subscribers. Flat payloads, one variant per lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationEvent {
    HoldPlaced {
        hold_token: Uuid,
        hotel_id: Uuid,
        room_type_ids: Vec<Uuid>,
        expires_at: DateTime<Utc>,
    },
    HoldExtended {
        hold_token: Uuid,
        hotel_id: Uuid,
        expires_at: DateTime<Utc>,
    },
    HoldReleased {
        hold_token: Uuid,
        hotel_id: Uuid,
    },
    HoldExpired {
        hold_token: Uuid,
        hotel_id: Uuid,
    },
    BookingCreated {
        booking_id: Uuid,
        code: String,
        hotel_id: Uuid,
        total_cents: i32,
    },
    BookingPaid {
        booking_id: Uuid,
        code: String,
        hotel_id: Uuid,
        amount_cents: i32,
    },
    BookingCancelled {
        booking_id: Uuid,
        code: String,
        hotel_id: Uuid,
        refund_cents: i32,
    },
}

impl ReservationEvent {
    /// Hotel the event belongs to, used by per-hotel SSE subscriptions.
    pub fn hotel_id(&self) -> Uuid {
        match self {
            ReservationEvent::HoldPlaced { hotel_id, .. }
            | ReservationEvent::HoldExtended { hotel_id, .. }
            | ReservationEvent::HoldReleased { hotel_id, .. }
            | ReservationEvent::HoldExpired { hotel_id, .. }
            | ReservationEvent::BookingCreated { hotel_id, .. }
            | ReservationEvent::BookingPaid { hotel_id, .. }
            | ReservationEvent::BookingCancelled { hotel_id, .. } => *hotel_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = ReservationEvent::HoldExpired {
            hold_token: Uuid::new_v4(),
            hotel_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "HOLD_EXPIRED");
    }
}
