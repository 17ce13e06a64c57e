use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use atria_core::stay::StayRange;

/// Per-date counters for one room type. Days are created lazily on first
/// touch and dropped again once both counters return to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DayCounts {
    held: i32,
    booked: i32,
}

#[derive(Debug)]
struct RoomInventory {
    total: i32,
    days: HashMap<NaiveDate, DayCounts>,
}

/// One reservation line: a quantity of one room type over a stay window.
#[derive(Debug, Clone, Copy)]
pub struct LedgerLine {
    pub room_type_id: Uuid,
    pub stay: StayRange,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub total: i32,
    pub held: i32,
    pub booked: i32,
    pub free: i32,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("unknown room type: {0}")]
    UnknownRoomType(Uuid),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("insufficient inventory for room type {room_type_id} on {dates:?}")]
    InsufficientInventory {
        room_type_id: Uuid,
        dates: Vec<NaiveDate>,
    },

    #[error("commit exceeds held inventory for room type {room_type_id} on {date}")]
    ConcurrencyConflict {
        room_type_id: Uuid,
        date: NaiveDate,
    },
}

/// Authoritative held/booked counts per (room type, calendar date).
///
/// Every mutation runs under the write lock of each touched room type, and
/// multi-room operations take those locks in sorted id order, so two
/// overlapping requests are serialized and can never reserve past capacity.
pub struct InventoryLedger {
    rooms: DashMap<Uuid, Arc<RwLock<RoomInventory>>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Register a room type's physical capacity, or update it in place.
    pub async fn register(&self, room_type_id: Uuid, total_rooms: i32) {
        let slot = self
            .rooms
            .entry(room_type_id)
            .or_insert_with(|| {
                Arc::new(RwLock::new(RoomInventory {
                    total: total_rooms,
                    days: HashMap::new(),
                }))
            })
            .clone();
        slot.write().await.total = total_rooms;
    }

    /// Free count per date: `total - held - booked`, never negative.
    pub async fn availability(
        &self,
        room_type_id: Uuid,
        stay: &StayRange,
    ) -> Result<Vec<DayAvailability>, LedgerError> {
        let room = self
            .rooms
            .get(&room_type_id)
            .map(|e| e.value().clone())
            .ok_or(LedgerError::UnknownRoomType(room_type_id))?;
        let guard = room.read().await;
        Ok(stay
            .dates()
            .map(|date| {
                let counts = guard.days.get(&date).copied().unwrap_or_default();
                DayAvailability {
                    date,
                    total: guard.total,
                    held: counts.held,
                    booked: counts.booked,
                    free: (guard.total - counts.held - counts.booked).max(0),
                }
            })
            .collect())
    }

    /// Counters for a single date, mainly for invariant assertions in tests.
    pub async fn day(
        &self,
        room_type_id: Uuid,
        date: NaiveDate,
    ) -> Result<DayAvailability, LedgerError> {
        let room = self
            .rooms
            .get(&room_type_id)
            .map(|e| e.value().clone())
            .ok_or(LedgerError::UnknownRoomType(room_type_id))?;
        let guard = room.read().await;
        let counts = guard.days.get(&date).copied().unwrap_or_default();
        Ok(DayAvailability {
            date,
            total: guard.total,
            held: counts.held,
            booked: counts.booked,
            free: (guard.total - counts.held - counts.booked).max(0),
        })
    }

    pub async fn reserve(
        &self,
        room_type_id: Uuid,
        stay: StayRange,
        quantity: i32,
    ) -> Result<(), LedgerError> {
        self.reserve_lines(&[LedgerLine {
            room_type_id,
            stay,
            quantity,
        }])
        .await
    }

    pub async fn release(
        &self,
        room_type_id: Uuid,
        stay: StayRange,
        quantity: i32,
    ) -> Result<(), LedgerError> {
        self.release_lines(&[LedgerLine {
            room_type_id,
            stay,
            quantity,
        }])
        .await
    }

    pub async fn commit(
        &self,
        room_type_id: Uuid,
        stay: StayRange,
        quantity: i32,
    ) -> Result<(), LedgerError> {
        self.commit_lines(&[LedgerLine {
            room_type_id,
            stay,
            quantity,
        }])
        .await
    }

    pub async fn cancel_booked(
        &self,
        room_type_id: Uuid,
        stay: StayRange,
        quantity: i32,
    ) -> Result<(), LedgerError> {
        self.cancel_lines(&[LedgerLine {
            room_type_id,
            stay,
            quantity,
        }])
        .await
    }

    /// Increment `held` for every line, all-or-nothing: every date of every
    /// line must have `free >= quantity`, otherwise nothing is mutated and
    /// the failing dates of the first short line are reported.
    pub async fn reserve_lines(&self, lines: &[LedgerLine]) -> Result<(), LedgerError> {
        let (mut guards, index) = self.lock_rooms(lines).await?;

        // Phase 1: validate every date of every line against current state,
        // including lines of the same batch that share a room type.
        let mut pending: HashMap<(Uuid, NaiveDate), i32> = HashMap::new();
        for line in lines {
            let guard = &guards[index[&line.room_type_id]];
            let mut short_dates = Vec::new();
            for date in line.stay.dates() {
                let counts = guard.days.get(&date).copied().unwrap_or_default();
                let already = pending
                    .get(&(line.room_type_id, date))
                    .copied()
                    .unwrap_or(0);
                let free = guard.total - counts.held - counts.booked - already;
                if free < line.quantity {
                    short_dates.push(date);
                }
            }
            if !short_dates.is_empty() {
                return Err(LedgerError::InsufficientInventory {
                    room_type_id: line.room_type_id,
                    dates: short_dates,
                });
            }
            for date in line.stay.dates() {
                *pending.entry((line.room_type_id, date)).or_insert(0) += line.quantity;
            }
        }

        // Phase 2: all validated, apply.
        for line in lines {
            let guard = &mut guards[index[&line.room_type_id]];
            for date in line.stay.dates() {
                guard.days.entry(date).or_default().held += line.quantity;
            }
        }
        Ok(())
    }

    /// Decrement `held`, floored at zero so a duplicate release is harmless.
    pub async fn release_lines(&self, lines: &[LedgerLine]) -> Result<(), LedgerError> {
        let (mut guards, index) = self.lock_rooms(lines).await?;
        for line in lines {
            let guard = &mut guards[index[&line.room_type_id]];
            for date in line.stay.dates() {
                if let Some(counts) = guard.days.get_mut(&date) {
                    counts.held = (counts.held - line.quantity).max(0);
                    if *counts == DayCounts::default() {
                        guard.days.remove(&date);
                    }
                }
            }
        }
        Ok(())
    }

    /// Move quantity from `held` to `booked`. Fails without mutating when any
    /// date holds less than the requested quantity.
    pub async fn commit_lines(&self, lines: &[LedgerLine]) -> Result<(), LedgerError> {
        let (mut guards, index) = self.lock_rooms(lines).await?;

        let mut spent: HashMap<(Uuid, NaiveDate), i32> = HashMap::new();
        for line in lines {
            let guard = &guards[index[&line.room_type_id]];
            for date in line.stay.dates() {
                let held = guard.days.get(&date).map(|c| c.held).unwrap_or(0);
                let already = spent.get(&(line.room_type_id, date)).copied().unwrap_or(0);
                if held - already < line.quantity {
                    return Err(LedgerError::ConcurrencyConflict {
                        room_type_id: line.room_type_id,
                        date,
                    });
                }
                *spent.entry((line.room_type_id, date)).or_insert(0) += line.quantity;
            }
        }

        for line in lines {
            let guard = &mut guards[index[&line.room_type_id]];
            for date in line.stay.dates() {
                let counts = guard.days.entry(date).or_default();
                counts.held -= line.quantity;
                counts.booked += line.quantity;
            }
        }
        Ok(())
    }

    /// Decrement `booked` (cancellation), floored at zero.
    pub async fn cancel_lines(&self, lines: &[LedgerLine]) -> Result<(), LedgerError> {
        let (mut guards, index) = self.lock_rooms(lines).await?;
        for line in lines {
            let guard = &mut guards[index[&line.room_type_id]];
            for date in line.stay.dates() {
                if let Some(counts) = guard.days.get_mut(&date) {
                    counts.booked = (counts.booked - line.quantity).max(0);
                    if *counts == DayCounts::default() {
                        guard.days.remove(&date);
                    }
                }
            }
        }
        Ok(())
    }

    /// Acquire write locks for every room type in the batch, in sorted id
    /// order so two concurrent multi-room operations cannot deadlock.
    async fn lock_rooms(
        &self,
        lines: &[LedgerLine],
    ) -> Result<
        (
            Vec<OwnedRwLockWriteGuard<RoomInventory>>,
            HashMap<Uuid, usize>,
        ),
        LedgerError,
    > {
        for line in lines {
            if line.quantity <= 0 {
                return Err(LedgerError::InvalidQuantity(line.quantity));
            }
        }
        let mut ids: Vec<Uuid> = lines.iter().map(|l| l.room_type_id).collect();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        let mut index = HashMap::new();
        for id in ids {
            let room = self
                .rooms
                .get(&id)
                .map(|e| e.value().clone())
                .ok_or(LedgerError::UnknownRoomType(id))?;
            index.insert(id, guards.len());
            guards.push(room.write_owned().await);
        }
        Ok((guards, index))
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}
