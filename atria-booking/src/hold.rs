use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{broadcast, OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use atria_catalog::ledger::{InventoryLedger, LedgerLine};
use atria_catalog::pricing::{PriceBreakdown, PricingEngine, QuoteLine};
use atria_catalog::room::RoomDirectory;
use atria_shared::events::ReservationEvent;

use crate::error::BookingError;
use crate::models::{Hold, HoldLine, HoldStatus};

#[derive(Debug, Clone, Serialize)]
pub struct HoldSummary {
    pub token: Uuid,
    pub hotel_id: Uuid,
    pub lines: Vec<HoldLine>,
    pub quote: PriceBreakdown,
    pub expires_at: DateTime<Utc>,
}

impl HoldSummary {
    fn from_hold(hold: &Hold) -> Self {
        Self {
            token: hold.token,
            hotel_id: hold.hotel_id,
            lines: hold.lines.clone(),
            quote: hold.quote.clone(),
            expires_at: hold.expires_at,
        }
    }
}

/// Write-lock guard over a hold that passed the consumption precondition
/// (`Active` and unexpired). While it is alive the expiry sweep cannot touch
/// the hold; dropping it without `finish()` leaves the hold `Active`.
pub struct ConsumeGuard {
    guard: OwnedRwLockWriteGuard<Hold>,
}

impl ConsumeGuard {
    pub fn hold(&self) -> &Hold {
        &self.guard
    }

    /// Commit the transition to `Consumed`.
    pub fn finish(mut self) {
        self.guard.status = HoldStatus::Consumed;
    }
}

/// Creates, extends, queries, expires and consumes holds. Every transition
/// out of `Active` is a conditional write under the hold's own lock, so the
/// sweep and a concurrent confirmation resolve to exactly one winner.
pub struct HoldManager {
    ledger: Arc<InventoryLedger>,
    rooms: Arc<dyn RoomDirectory>,
    pricing: Arc<PricingEngine>,
    holds: DashMap<Uuid, Arc<RwLock<Hold>>>,
    ttl: Duration,
    events: broadcast::Sender<ReservationEvent>,
}

impl HoldManager {
    pub fn new(
        ledger: Arc<InventoryLedger>,
        rooms: Arc<dyn RoomDirectory>,
        pricing: Arc<PricingEngine>,
        ttl: Duration,
        events: broadcast::Sender<ReservationEvent>,
    ) -> Self {
        Self {
            ledger,
            rooms,
            pricing,
            holds: DashMap::new(),
            ttl,
            events,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve every line against the catalog: room must exist and be
    /// bookable, occupancy must fit, and all lines must target one hotel.
    async fn resolve_lines(
        &self,
        lines: &[HoldLine],
    ) -> Result<(Uuid, Vec<QuoteLine>), BookingError> {
        if lines.is_empty() {
            return Err(BookingError::InvalidStay(
                "at least one room line is required".to_string(),
            ));
        }
        let mut hotel_id: Option<Uuid> = None;
        let mut quote_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let room = self
                .rooms
                .get_room_type(line.room_type_id)
                .await
                .map_err(|e| BookingError::Repository(e.to_string()))?
                .filter(|r| r.is_bookable())
                .ok_or(BookingError::RoomTypeNotFound(line.room_type_id))?;

            if line.adults <= 0 || line.adults > room.max_occupancy {
                return Err(BookingError::InvalidStay(format!(
                    "{} sleeps at most {} guests",
                    room.name, room.max_occupancy
                )));
            }
            match hotel_id {
                None => hotel_id = Some(room.hotel_id),
                Some(id) if id != room.hotel_id => {
                    return Err(BookingError::InvalidStay(
                        "all rooms in a hold must belong to the same hotel".to_string(),
                    ))
                }
                Some(_) => {}
            }
            quote_lines.push(QuoteLine {
                nightly_rate_cents: room.base_rate_cents,
                stay: line.stay,
                quantity: line.quantity,
                adults: line.adults,
                meal_plan: line.meal_plan,
                extras: line.extras.clone(),
            });
        }
        Ok((hotel_id.expect("non-empty lines"), quote_lines))
    }

    /// Price a request without touching inventory.
    pub async fn quote(&self, lines: &[HoldLine]) -> Result<PriceBreakdown, BookingError> {
        let (_, quote_lines) = self.resolve_lines(lines).await?;
        Ok(self.pricing.quote(&quote_lines))
    }

    /// Validate the request, reserve inventory for every line (all-or-nothing)
    /// and persist an `Active` hold with a fresh TTL.
    pub async fn create(&self, lines: Vec<HoldLine>) -> Result<HoldSummary, BookingError> {
        let (hotel_id, quote_lines) = self.resolve_lines(&lines).await?;

        let ledger_lines: Vec<LedgerLine> = lines.iter().map(HoldLine::ledger_line).collect();
        self.ledger.reserve_lines(&ledger_lines).await?;

        let now = Utc::now();
        let hold = Hold {
            token: Uuid::new_v4(),
            hotel_id,
            quote: self.pricing.quote(&quote_lines),
            lines,
            status: HoldStatus::Active,
            created_at: now,
            expires_at: now + self.ttl,
        };
        let summary = HoldSummary::from_hold(&hold);

        tracing::info!(token = %hold.token, expires_at = %hold.expires_at, "hold placed");
        let _ = self.events.send(ReservationEvent::HoldPlaced {
            hold_token: hold.token,
            hotel_id,
            room_type_ids: hold.lines.iter().map(|l| l.room_type_id).collect(),
            expires_at: hold.expires_at,
        });
        self.holds.insert(hold.token, Arc::new(RwLock::new(hold)));
        Ok(summary)
    }

    /// Summary of a live hold. Expired or terminal holds are reported as
    /// absent — a stale-active hold is never observable, even between sweeps.
    pub async fn summary(&self, token: Uuid) -> Option<HoldSummary> {
        let hold = self.holds.get(&token)?.value().clone();
        let guard = hold.read().await;
        if guard.status != HoldStatus::Active || guard.is_expired(Utc::now()) {
            return None;
        }
        Some(HoldSummary::from_hold(&guard))
    }

    /// Push `expires_at` out by one more TTL. Fails once the hold expired —
    /// there is no retroactive extension.
    pub async fn extend(&self, token: Uuid) -> Result<DateTime<Utc>, BookingError> {
        let hold = self
            .holds
            .get(&token)
            .map(|e| e.value().clone())
            .ok_or(BookingError::HoldNotFound)?;
        let mut guard = hold.write().await;
        match guard.status {
            HoldStatus::Active => {}
            HoldStatus::Expired => return Err(BookingError::HoldExpired),
            HoldStatus::Released | HoldStatus::Consumed => return Err(BookingError::HoldNotFound),
        }
        let now = Utc::now();
        if guard.is_expired(now) {
            return Err(BookingError::HoldExpired);
        }
        guard.expires_at = now + self.ttl;
        tracing::info!(token = %token, expires_at = %guard.expires_at, "hold extended");
        let _ = self.events.send(ReservationEvent::HoldExtended {
            hold_token: token,
            hotel_id: guard.hotel_id,
            expires_at: guard.expires_at,
        });
        Ok(guard.expires_at)
    }

    /// Idempotent release. Unknown tokens and already-terminal holds are
    /// no-ops; the inventory delta is returned exactly once.
    pub async fn release(&self, token: Uuid) -> Result<(), BookingError> {
        let hold = match self.holds.get(&token).map(|e| e.value().clone()) {
            Some(hold) => hold,
            None => return Ok(()),
        };
        let mut guard = hold.write().await;
        if guard.status != HoldStatus::Active {
            return Ok(());
        }
        guard.status = HoldStatus::Released;
        let lines: Vec<LedgerLine> = guard.lines.iter().map(HoldLine::ledger_line).collect();
        self.ledger.release_lines(&lines).await?;
        tracing::info!(token = %token, "hold released");
        let _ = self.events.send(ReservationEvent::HoldReleased {
            hold_token: token,
            hotel_id: guard.hotel_id,
        });
        Ok(())
    }

    /// Acquire the hold for consumption. The returned guard keeps the sweep
    /// out until the caller either finishes (marking the hold `Consumed`) or
    /// drops it (leaving the hold `Active`, e.g. on a price mismatch).
    pub async fn begin_consume(&self, token: Uuid) -> Result<ConsumeGuard, BookingError> {
        let hold = self
            .holds
            .get(&token)
            .map(|e| e.value().clone())
            .ok_or(BookingError::HoldNotFound)?;
        let guard = hold.write_owned().await;
        match guard.status {
            HoldStatus::Active => {}
            HoldStatus::Expired => return Err(BookingError::HoldExpired),
            HoldStatus::Released | HoldStatus::Consumed => return Err(BookingError::HoldNotFound),
        }
        if guard.is_expired(Utc::now()) {
            // The sweep has not caught this one yet; the read guard still
            // refuses it and the sweep will release the inventory.
            return Err(BookingError::HoldExpired);
        }
        Ok(ConsumeGuard { guard })
    }

    /// Expire every `Active` hold past its deadline, releasing inventory
    /// exactly once per hold. Safe to run concurrently with consumption:
    /// whichever side takes the hold's write lock first wins, the loser sees
    /// the terminal status and backs off.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut candidates = Vec::new();
        for entry in self.holds.iter() {
            let arc = entry.value().clone();
            let is_candidate = if let Ok(guard) = arc.try_read() {
                guard.status == HoldStatus::Active && guard.is_expired(now)
            } else {
                false
            };
            if is_candidate {
                candidates.push(arc.clone());
            }
        }

        let mut reaped = 0;
        for arc in candidates {
            let mut guard = arc.write().await;
            // Re-check under the write lock; a consume or extend may have won.
            if guard.status != HoldStatus::Active || !guard.is_expired(now) {
                continue;
            }
            guard.status = HoldStatus::Expired;
            let lines: Vec<LedgerLine> = guard.lines.iter().map(HoldLine::ledger_line).collect();
            if let Err(e) = self.ledger.release_lines(&lines).await {
                tracing::error!(token = %guard.token, "failed to release expired hold: {e}");
                continue;
            }
            tracing::info!(token = %guard.token, "hold expired, inventory released");
            let _ = self.events.send(ReservationEvent::HoldExpired {
                hold_token: guard.token,
                hotel_id: guard.hotel_id,
            });
            reaped += 1;
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atria_catalog::pricing::{MealPlan, PricingConfig};
    use atria_catalog::room::{Hotel, RoomCatalog, RoomType, RoomTypeStatus};
    use atria_core::stay::StayRange;

    fn stay(check_in: &str, check_out: &str) -> StayRange {
        StayRange::new(check_in.parse().unwrap(), check_out.parse().unwrap()).unwrap()
    }

    struct Fixture {
        ledger: Arc<InventoryLedger>,
        manager: Arc<HoldManager>,
        room_id: Uuid,
    }

    async fn fixture(total_rooms: i32, ttl: Duration) -> Fixture {
        let catalog = Arc::new(RoomCatalog::new());
        let hotel = Hotel {
            id: Uuid::new_v4(),
            slug: "harbor-view".to_string(),
            name: "Harbor View".to_string(),
            city: "Lisbon".to_string(),
            description: None,
        };
        let room = RoomType {
            id: Uuid::new_v4(),
            hotel_id: hotel.id,
            name: "Deluxe Double".to_string(),
            description: None,
            total_rooms,
            base_rate_cents: 10_000,
            max_occupancy: 3,
            status: RoomTypeStatus::Active,
        };
        let room_id = room.id;
        catalog.upsert_hotel(hotel);
        catalog.upsert_room_type(room);

        let ledger = Arc::new(InventoryLedger::new());
        ledger.register(room_id, total_rooms).await;

        let (events, _) = broadcast::channel(64);
        let manager = Arc::new(HoldManager::new(
            ledger.clone(),
            catalog,
            Arc::new(PricingEngine::new(PricingConfig::default())),
            ttl,
            events,
        ));
        Fixture {
            ledger,
            manager,
            room_id,
        }
    }

    fn line(room_id: Uuid, quantity: i32) -> HoldLine {
        HoldLine {
            room_type_id: room_id,
            quantity,
            stay: stay("2024-06-01", "2024-06-04"),
            adults: 2,
            meal_plan: MealPlan::RoomOnly,
            extras: vec![],
        }
    }

    #[tokio::test]
    async fn create_reserves_inventory_and_quotes() {
        let fx = fixture(2, Duration::minutes(15)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 2)]).await.unwrap();

        assert_eq!(summary.quote.room_subtotal_cents, 60_000); // 100 x 3 nights x 2 rooms
        let day = fx.ledger.day(fx.room_id, "2024-06-01".parse().unwrap()).await.unwrap();
        assert_eq!(day.held, 2);

        assert!(fx.manager.summary(summary.token).await.is_some());
    }

    #[tokio::test]
    async fn overcommit_fails_in_submission_order() {
        let fx = fixture(2, Duration::minutes(15)).await;

        assert!(fx.manager.create(vec![line(fx.room_id, 2)]).await.is_ok());
        let err = fx.manager.create(vec![line(fx.room_id, 1)]).await.unwrap_err();
        assert!(matches!(err, BookingError::InsufficientInventory { .. }));

        // The failed attempt must leave counters untouched.
        let day = fx.ledger.day(fx.room_id, "2024-06-02".parse().unwrap()).await.unwrap();
        assert_eq!(day.held, 2);
    }

    #[tokio::test]
    async fn expired_hold_is_invisible_before_the_sweep_runs() {
        let fx = fixture(2, Duration::seconds(-1)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 1)]).await.unwrap();

        // Born expired; the check-on-read guard hides it immediately.
        assert!(fx.manager.summary(summary.token).await.is_none());
        assert!(matches!(
            fx.manager.extend(summary.token).await,
            Err(BookingError::HoldExpired)
        ));
        assert!(matches!(
            fx.manager.begin_consume(summary.token).await,
            Err(BookingError::HoldExpired)
        ));
    }

    #[tokio::test]
    async fn sweep_releases_inventory_exactly_once() {
        let fx = fixture(2, Duration::seconds(-1)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 2)]).await.unwrap();

        assert_eq!(fx.manager.sweep(Utc::now()).await, 1);
        let day = fx.ledger.day(fx.room_id, "2024-06-01".parse().unwrap()).await.unwrap();
        assert_eq!(day.held, 0);
        assert_eq!(day.free, 2);

        // A second sweep and a late release are both no-ops.
        assert_eq!(fx.manager.sweep(Utc::now()).await, 0);
        fx.manager.release(summary.token).await.unwrap();
        let day = fx.ledger.day(fx.room_id, "2024-06-01".parse().unwrap()).await.unwrap();
        assert_eq!(day.held, 0);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let fx = fixture(2, Duration::minutes(15)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 2)]).await.unwrap();

        fx.manager.release(summary.token).await.unwrap();
        fx.manager.release(summary.token).await.unwrap();
        fx.manager.release(Uuid::new_v4()).await.unwrap(); // unknown token

        let day = fx.ledger.day(fx.room_id, "2024-06-01".parse().unwrap()).await.unwrap();
        assert_eq!(day.held, 0);
        assert_eq!(day.free, 2);
    }

    #[tokio::test]
    async fn extend_pushes_the_deadline() {
        let fx = fixture(2, Duration::minutes(15)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 1)]).await.unwrap();

        let new_deadline = fx.manager.extend(summary.token).await.unwrap();
        assert!(new_deadline >= summary.expires_at);
    }

    #[tokio::test]
    async fn consume_blocks_the_sweep_and_wins() {
        let fx = fixture(2, Duration::minutes(15)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 1)]).await.unwrap();

        let consume = fx.manager.begin_consume(summary.token).await.unwrap();
        // Sweep runs with a clock far in the future while the guard is held
        // in this task; once it gets the lock the hold is already consumed.
        consume.finish();
        let reaped = fx.manager.sweep(Utc::now() + Duration::hours(1)).await;
        assert_eq!(reaped, 0);

        // Consumed tokens are gone for every other operation.
        assert!(matches!(
            fx.manager.begin_consume(summary.token).await,
            Err(BookingError::HoldNotFound)
        ));
        assert!(fx.manager.summary(summary.token).await.is_none());
    }

    #[tokio::test]
    async fn sweep_beats_a_late_consume() {
        let fx = fixture(2, Duration::seconds(-1)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 1)]).await.unwrap();

        assert_eq!(fx.manager.sweep(Utc::now()).await, 1);
        assert!(matches!(
            fx.manager.begin_consume(summary.token).await,
            Err(BookingError::HoldExpired)
        ));
    }

    #[tokio::test]
    async fn dropped_consume_guard_leaves_hold_active() {
        let fx = fixture(2, Duration::minutes(15)).await;
        let summary = fx.manager.create(vec![line(fx.room_id, 1)]).await.unwrap();

        {
            let _guard = fx.manager.begin_consume(summary.token).await.unwrap();
            // dropped without finish() — e.g. price mismatch
        }
        assert!(fx.manager.summary(summary.token).await.is_some());
    }
}
