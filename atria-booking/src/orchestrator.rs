use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use atria_catalog::ledger::{InventoryLedger, LedgerLine};
use atria_catalog::pricing::{PricingEngine, QuoteLine};
use atria_catalog::room::RoomDirectory;
use atria_core::guest::GuestDetails;
use atria_core::payment::{
    GatewayEvent, GatewayEventKind, PaymentAdapter, PaymentIntent, PaymentStatus,
};
use atria_shared::events::ReservationEvent;

use crate::error::BookingError;
use crate::hold::HoldManager;
use crate::models::{
    generate_booking_code, Booking, BookingLine, BookingStatus, HoldLine, PaymentState,
};

#[derive(Debug, Clone)]
pub struct BookingDetails {
    pub guest: GuestDetails,
    /// Total the client believes it is paying, used purely as a cross-check.
    /// The server-side re-derived price is always the one persisted.
    pub expected_total_cents: Option<i32>,
}

/// Refund computation input, loaded from configuration.
#[derive(Debug, Clone)]
pub struct CancellationPolicy {
    /// Cancelling at least this many days before check-in refunds in full.
    pub free_cancel_days: i64,
    /// Refund percentage inside the window (but before check-in day).
    pub late_refund_percent: i32,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            free_cancel_days: 7,
            late_refund_percent: 50,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RefundInfo {
    pub amount_cents: i32,
    /// False when no refund was due, or the gateway refund did not go through.
    pub refunded: bool,
}

/// Converts valid holds into durable bookings and walks bookings through
/// payment, cancellation and stay lifecycle transitions.
pub struct BookingOrchestrator {
    holds: Arc<HoldManager>,
    ledger: Arc<InventoryLedger>,
    rooms: Arc<dyn RoomDirectory>,
    pricing: Arc<PricingEngine>,
    payments: Arc<dyn PaymentAdapter>,
    bookings: DashMap<Uuid, Arc<RwLock<Booking>>>,
    codes: DashMap<String, Uuid>,
    /// Gateway intent id -> booking id, for webhook correlation.
    intents: DashMap<String, Uuid>,
    policy: CancellationPolicy,
    price_tolerance_cents: i32,
    events: broadcast::Sender<ReservationEvent>,
}

impl BookingOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        holds: Arc<HoldManager>,
        ledger: Arc<InventoryLedger>,
        rooms: Arc<dyn RoomDirectory>,
        pricing: Arc<PricingEngine>,
        payments: Arc<dyn PaymentAdapter>,
        policy: CancellationPolicy,
        price_tolerance_cents: i32,
        events: broadcast::Sender<ReservationEvent>,
    ) -> Self {
        Self {
            holds,
            ledger,
            rooms,
            pricing,
            payments,
            bookings: DashMap::new(),
            codes: DashMap::new(),
            intents: DashMap::new(),
            policy,
            price_tolerance_cents,
            events,
        }
    }

    /// Convert a still-active hold into a `PENDING_PAYMENT` booking.
    ///
    /// Runs entirely under the hold's write lock: the expiry sweep cannot
    /// interleave, and a price mismatch aborts before anything is consumed,
    /// leaving the hold active for a fresh quote.
    pub async fn create_booking_from_hold(
        &self,
        token: Uuid,
        details: BookingDetails,
    ) -> Result<Booking, BookingError> {
        let consume = self.holds.begin_consume(token).await?;
        let hold = consume.hold();

        // Re-derive the price from current rates; never trust the client's
        // number, and reject when the server-side quote itself has drifted.
        let mut quote_lines = Vec::with_capacity(hold.lines.len());
        for line in &hold.lines {
            let room = self
                .rooms
                .get_room_type(line.room_type_id)
                .await
                .map_err(|e| BookingError::Repository(e.to_string()))?
                .ok_or(BookingError::RoomTypeNotFound(line.room_type_id))?;
            quote_lines.push(QuoteLine {
                nightly_rate_cents: room.base_rate_cents,
                stay: line.stay,
                quantity: line.quantity,
                adults: line.adults,
                meal_plan: line.meal_plan,
                extras: line.extras.clone(),
            });
        }
        let current = self.pricing.quote(&quote_lines);

        let drift = (current.total_cents - hold.quote.total_cents).abs();
        if drift > self.price_tolerance_cents {
            return Err(BookingError::PriceMismatch {
                quoted_cents: hold.quote.total_cents,
                current_cents: current.total_cents,
            });
        }
        if let Some(expected) = details.expected_total_cents {
            if expected != current.total_cents {
                return Err(BookingError::PriceMismatch {
                    quoted_cents: expected,
                    current_cents: current.total_cents,
                });
            }
        }

        let ledger_lines: Vec<LedgerLine> = hold.lines.iter().map(HoldLine::ledger_line).collect();
        self.ledger.commit_lines(&ledger_lines).await?;

        let now = Utc::now();
        let lines: Vec<BookingLine> = hold
            .lines
            .iter()
            .zip(current.lines.iter())
            .map(|(line, price)| BookingLine {
                room_type_id: line.room_type_id,
                quantity: line.quantity,
                stay: line.stay,
                adults: line.adults,
                meal_plan: line.meal_plan,
                extras: line.extras.clone(),
                price: price.clone(),
            })
            .collect();
        let booking = Booking {
            id: Uuid::new_v4(),
            code: self.claim_code(),
            hotel_id: hold.hotel_id,
            guest: details.guest,
            lines,
            quote: current,
            status: BookingStatus::PendingPayment,
            payment_state: PaymentState::Pending,
            payment_intent_id: None,
            hold_token: token,
            created_at: now,
            updated_at: now,
        };
        consume.finish();

        self.codes.insert(booking.code.clone(), booking.id);
        self.bookings
            .insert(booking.id, Arc::new(RwLock::new(booking.clone())));

        tracing::info!(code = %booking.code, total = booking.quote.total_cents, "booking created from hold");
        let _ = self.events.send(ReservationEvent::BookingCreated {
            booking_id: booking.id,
            code: booking.code.clone(),
            hotel_id: booking.hotel_id,
            total_cents: booking.quote.total_cents,
        });
        Ok(booking)
    }

    pub async fn get_booking(&self, code: &str) -> Option<Booking> {
        let id = *self.codes.get(code)?.value();
        let booking = self.bookings.get(&id)?.value().clone();
        let guard = booking.read().await;
        Some(guard.clone())
    }

    /// Drive a direct payment through the gateway. A gateway decline keeps
    /// the booking `PENDING_PAYMENT` with inventory committed; retrying is
    /// allowed, cancellation stays an explicit step.
    pub async fn pay_booking(
        &self,
        code: &str,
        reference: Option<String>,
    ) -> Result<Booking, BookingError> {
        let arc = self.booking_arc(code)?;
        let mut booking = arc.write().await;

        match booking.status {
            BookingStatus::PendingPayment | BookingStatus::Confirmed => {}
            other => {
                return Err(BookingError::InvalidTransition {
                    from: other.as_str().to_string(),
                    to: BookingStatus::Confirmed.as_str().to_string(),
                })
            }
        }
        if booking.payment_state == PaymentState::Paid {
            return Ok(booking.clone());
        }

        let mut intent = self
            .payments
            .create_intent(
                booking.id,
                booking.quote.total_cents,
                &booking.quote.currency,
            )
            .await
            .map_err(|e| BookingError::PaymentFailed(e.to_string()))?;
        intent.reference = reference;

        self.intents.insert(intent.id.clone(), booking.id);
        booking.payment_intent_id = Some(intent.id.clone());

        let status = self
            .payments
            .process_payment(&intent)
            .await
            .map_err(|e| BookingError::PaymentFailed(e.to_string()))?;

        booking.updated_at = Utc::now();
        match status {
            PaymentStatus::Succeeded => {
                booking.payment_state = PaymentState::Paid;
                booking.status = BookingStatus::Confirmed;
                tracing::info!(code = %booking.code, "booking paid");
                let _ = self.events.send(ReservationEvent::BookingPaid {
                    booking_id: booking.id,
                    code: booking.code.clone(),
                    hotel_id: booking.hotel_id,
                    amount_cents: booking.quote.total_cents,
                });
                Ok(booking.clone())
            }
            PaymentStatus::Processing => {
                // Asynchronous gateway; the webhook settles the outcome.
                booking.payment_state = PaymentState::Pending;
                Ok(booking.clone())
            }
            _ => {
                booking.payment_state = PaymentState::Failed;
                Err(BookingError::PaymentFailed(format!(
                    "gateway returned {status:?}"
                )))
            }
        }
    }

    /// Reconcile a normalized gateway notification. Re-deliveries are safe:
    /// an already-paid booking absorbs a duplicate success event unchanged.
    pub async fn handle_gateway_event(
        &self,
        event: GatewayEvent,
    ) -> Result<Booking, BookingError> {
        let booking_id = *self
            .intents
            .get(&event.intent_id)
            .ok_or_else(|| BookingError::BookingNotFound(event.intent_id.clone()))?
            .value();
        let arc = self
            .bookings
            .get(&booking_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;
        let mut booking = arc.write().await;

        match event.kind {
            GatewayEventKind::PaymentSucceeded => {
                if booking.payment_state != PaymentState::Paid {
                    booking.payment_state = PaymentState::Paid;
                    if booking.status == BookingStatus::PendingPayment {
                        booking.status = BookingStatus::Confirmed;
                    }
                    tracing::info!(code = %booking.code, gateway = %event.gateway, "payment confirmed via webhook");
                    let _ = self.events.send(ReservationEvent::BookingPaid {
                        booking_id: booking.id,
                        code: booking.code.clone(),
                        hotel_id: booking.hotel_id,
                        amount_cents: event.amount_cents.unwrap_or(booking.quote.total_cents),
                    });
                }
            }
            GatewayEventKind::PaymentFailed => {
                if booking.payment_state != PaymentState::Paid {
                    booking.payment_state = PaymentState::Failed;
                    tracing::info!(code = %booking.code, gateway = %event.gateway, "payment failed via webhook");
                }
            }
            GatewayEventKind::PaymentRefunded => {
                booking.payment_state = PaymentState::Refunded;
                tracing::info!(code = %booking.code, gateway = %event.gateway, "payment refunded via webhook");
            }
        }
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    /// Cancel a booking that has not started its stay, freeing the booked
    /// inventory and computing the refund from the configured policy.
    pub async fn cancel_booking(
        &self,
        code: &str,
        reason: Option<String>,
    ) -> Result<(Booking, RefundInfo), BookingError> {
        let arc = self.booking_arc(code)?;
        let mut booking = arc.write().await;

        match booking.status {
            BookingStatus::CheckedIn | BookingStatus::CheckedOut => {
                return Err(BookingError::InvalidTransition {
                    from: booking.status.as_str().to_string(),
                    to: BookingStatus::Cancelled.as_str().to_string(),
                })
            }
            BookingStatus::Cancelled => {
                // Idempotent: a repeated cancel changes nothing.
                return Ok((
                    booking.clone(),
                    RefundInfo {
                        amount_cents: 0,
                        refunded: false,
                    },
                ));
            }
            BookingStatus::PendingPayment | BookingStatus::Confirmed => {}
        }

        let ledger_lines: Vec<LedgerLine> = booking
            .lines
            .iter()
            .map(|l| LedgerLine {
                room_type_id: l.room_type_id,
                stay: l.stay,
                quantity: l.quantity,
            })
            .collect();
        self.ledger.cancel_lines(&ledger_lines).await?;

        let refund_due = if booking.payment_state == PaymentState::Paid {
            self.refund_amount(&booking)
        } else {
            0
        };
        let mut refunded = false;
        if refund_due > 0 {
            if let Some(intent_id) = booking.payment_intent_id.clone() {
                match self.payments.refund(&intent_id, refund_due).await {
                    Ok(PaymentStatus::Refunded) => {
                        booking.payment_state = PaymentState::Refunded;
                        refunded = true;
                    }
                    Ok(other) => {
                        tracing::error!(code = %booking.code, "refund not settled, gateway returned {other:?}");
                    }
                    Err(e) => {
                        // The cancellation stands; the refund is retried out
                        // of band by operations.
                        tracing::error!(code = %booking.code, "refund failed: {e}");
                    }
                }
            }
        }

        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        tracing::info!(
            code = %booking.code,
            refund = refund_due,
            reason = reason.as_deref().unwrap_or("-"),
            "booking cancelled"
        );
        let _ = self.events.send(ReservationEvent::BookingCancelled {
            booking_id: booking.id,
            code: booking.code.clone(),
            hotel_id: booking.hotel_id,
            refund_cents: refund_due,
        });
        Ok((
            booking.clone(),
            RefundInfo {
                amount_cents: refund_due,
                refunded,
            },
        ))
    }

    pub async fn check_in(&self, code: &str) -> Result<Booking, BookingError> {
        self.transition(code, BookingStatus::Confirmed, BookingStatus::CheckedIn)
            .await
    }

    pub async fn check_out(&self, code: &str) -> Result<Booking, BookingError> {
        self.transition(code, BookingStatus::CheckedIn, BookingStatus::CheckedOut)
            .await
    }

    async fn transition(
        &self,
        code: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let arc = self.booking_arc(code)?;
        let mut booking = arc.write().await;
        if booking.status != from {
            return Err(BookingError::InvalidTransition {
                from: booking.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        booking.status = to;
        booking.updated_at = Utc::now();
        tracing::info!(code = %booking.code, status = to.as_str(), "booking transitioned");
        Ok(booking.clone())
    }

    fn booking_arc(&self, code: &str) -> Result<Arc<RwLock<Booking>>, BookingError> {
        let id = *self
            .codes
            .get(code)
            .ok_or_else(|| BookingError::BookingNotFound(code.to_string()))?
            .value();
        self.bookings
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| BookingError::BookingNotFound(code.to_string()))
    }

    fn claim_code(&self) -> String {
        loop {
            let code = generate_booking_code();
            if !self.codes.contains_key(&code) {
                return code;
            }
        }
    }

    fn refund_amount(&self, booking: &Booking) -> i32 {
        let check_in = match booking.lines.iter().map(|l| l.stay.check_in()).min() {
            Some(date) => date,
            None => return 0,
        };
        let days_until = (check_in - Utc::now().date_naive()).num_days();
        if days_until >= self.policy.free_cancel_days {
            booking.quote.total_cents
        } else if days_until >= 1 {
            (booking.quote.total_cents as i64 * self.policy.late_refund_percent as i64 / 100) as i32
        } else {
            0
        }
    }
}

/// Development/test gateway. Reference strings steer the outcome:
/// `fail-gateway` errors out, `declined` is rejected, `async` stays
/// processing until a webhook settles it; anything else succeeds.
pub struct MockPaymentAdapter;

#[async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn create_intent(
        &self,
        booking_id: Uuid,
        amount_cents: i32,
        currency: &str,
    ) -> Result<PaymentIntent, Box<dyn std::error::Error + Send + Sync>> {
        Ok(PaymentIntent {
            // Encode booking_id in intent_id for the mock to "remember" it
            id: format!("mock_pi_{}", booking_id.simple()),
            booking_id,
            amount_cents,
            currency: currency.to_string(),
            status: PaymentStatus::RequiresPaymentMethod,
            reference: None,
            client_secret: Some("mock_secret_123".to_string()),
            created_at: Utc::now(),
        })
    }

    async fn get_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, Box<dyn std::error::Error + Send + Sync>> {
        let booking_id_str = intent_id.strip_prefix("mock_pi_").unwrap_or_default();
        let booking_id = Uuid::parse_str(booking_id_str).unwrap_or_else(|_| Uuid::new_v4());
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            booking_id,
            amount_cents: 0,
            currency: "USD".to_string(),
            status: PaymentStatus::Succeeded,
            reference: None,
            client_secret: None,
            created_at: Utc::now(),
        })
    }

    async fn process_payment(
        &self,
        payment: &PaymentIntent,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>> {
        match payment.reference.as_deref() {
            Some("fail-gateway") => Err("Simulated Payment Gateway Failure".into()),
            Some("declined") => Ok(PaymentStatus::Failed),
            Some("async") => Ok(PaymentStatus::Processing),
            _ => Ok(PaymentStatus::Succeeded),
        }
    }

    async fn refund(
        &self,
        _intent_id: &str,
        _amount_cents: i32,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>> {
        Ok(PaymentStatus::Refunded)
    }
}
