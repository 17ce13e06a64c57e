use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use atria_booking::expiry::run_expiry_sweep;
use atria_booking::HoldManager;

/// Start the background hold-expiry worker. The interval bounds how long an
/// abandoned hold can sit on inventory past its TTL.
pub fn spawn_expiry_worker(holds: Arc<HoldManager>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));
    info!("Expiry worker started, sweeping every {:?}", interval);
    tokio::spawn(run_expiry_sweep(holds, interval))
}
