use std::sync::Arc;

use tokio::sync::broadcast;

use atria_booking::{BookingOrchestrator, HoldManager};
use atria_catalog::ledger::InventoryLedger;
use atria_catalog::pricing::PricingEngine;
use atria_catalog::room::RoomCatalog;
use atria_shared::events::ReservationEvent;
use atria_store::BusinessRules;

use crate::middleware::resiliency::CircuitBreaker;

pub struct Resiliency {
    pub payment_cb: CircuitBreaker,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RoomCatalog>,
    pub ledger: Arc<InventoryLedger>,
    pub pricing: Arc<PricingEngine>,
    pub holds: Arc<HoldManager>,
    pub orchestrator: Arc<BookingOrchestrator>,
    pub events_tx: broadcast::Sender<ReservationEvent>,
    pub business_rules: BusinessRules,
    pub resiliency: Arc<Resiliency>,
}
