use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use skybook_booking::Reconciler;

/// Runs the reconciler every `period` until the task is aborted.
pub fn start_reconciliation_worker(reconciler: Reconciler, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Reconciliation worker started, running every {:?}", period);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match reconciler.run_once().await {
                Ok(report) if report.is_clean() => {}
                Ok(report) => info!(
                    cancelled_bookings = ?report.cancelled_bookings,
                    released_seats = report.released_seats,
                    "Reconciliation repaired inconsistencies"
                ),
                Err(e) => error!("Reconciliation failed: {}", e),
            }
        }
    })
}
