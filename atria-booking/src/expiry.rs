use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::hold::HoldManager;

/// Background task that periodically expires overdue holds. The interval
/// bounds how long a dead hold can keep inventory off the market; the
/// check-on-read guards in `HoldManager` cover the gap in between.
pub async fn run_expiry_sweep(holds: Arc<HoldManager>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let reaped = holds.sweep(Utc::now()).await;
        if reaped > 0 {
            info!("expiry sweep released {reaped} hold(s)");
        }
    }
}
