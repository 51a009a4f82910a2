use std::time::Duration;

use tracing::error;

use crate::services::booking::ReservationEngine;

/// Background reconciliation loop: periodically reverts booked seats that
/// never got their ticket (crash between the seat write and the ticket
/// write). Spawned once at startup.
pub async fn run(engine: ReservationEngine, interval_seconds: u64) {
    loop {
        if let Err(e) = engine.sweep_ghost_locks().await {
            error!("ghost-lock sweep failed: {}", e);
        }
        tokio::time::sleep(Duration::from_secs(interval_seconds)).await;
    }
}
