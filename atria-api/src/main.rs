use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atria_api::{app, middleware::resiliency::CircuitBreaker, state::Resiliency, AppState};
use atria_booking::{
    BookingOrchestrator, CancellationPolicy, HoldManager, MockPaymentAdapter,
};
use atria_catalog::ledger::InventoryLedger;
use atria_catalog::pricing::PricingEngine;
use atria_catalog::room::RoomCatalog;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atria_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = atria_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Atria API on port {}", config.server.port);

    let catalog = Arc::new(RoomCatalog::new());
    let ledger = Arc::new(InventoryLedger::new());
    let pricing = Arc::new(PricingEngine::new(config.pricing.clone()));
    let (events_tx, _) = tokio::sync::broadcast::channel(256);

    if config.server.seed_demo {
        atria_store::seed::seed_demo_catalog(&catalog, &ledger).await;
    }

    let holds = Arc::new(HoldManager::new(
        ledger.clone(),
        catalog.clone(),
        pricing.clone(),
        chrono::Duration::seconds(config.business_rules.hold_ttl_seconds),
        events_tx.clone(),
    ));
    let orchestrator = Arc::new(BookingOrchestrator::new(
        holds.clone(),
        ledger.clone(),
        catalog.clone(),
        pricing.clone(),
        Arc::new(MockPaymentAdapter),
        CancellationPolicy {
            free_cancel_days: config.business_rules.free_cancel_days,
            late_refund_percent: config.business_rules.late_refund_percent,
        },
        config.business_rules.price_tolerance_cents,
        events_tx.clone(),
    ));

    atria_api::worker::spawn_expiry_worker(
        holds.clone(),
        config.business_rules.sweep_interval_seconds,
    );

    let app_state = AppState {
        catalog,
        ledger,
        pricing,
        holds,
        orchestrator,
        events_tx,
        business_rules: config.business_rules.clone(),
        resiliency: Arc::new(Resiliency {
            payment_cb: CircuitBreaker::new("payment", 5, Duration::from_secs(30)),
        }),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
