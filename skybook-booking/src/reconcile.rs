use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use skybook_core::{bounded, BookingStatus, CoreResult, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Live bookings found without seats and cancelled.
    pub cancelled_bookings: Vec<i64>,
    /// BOOKED seats owned by a cancelled booking and freed.
    pub released_seats: u64,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.cancelled_bookings.is_empty() && self.released_seats == 0
    }
}

/// Repairs seat/booking state left behind by interrupted writes.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// One repair pass in a single unit of work.
    pub async fn run_once(&self) -> CoreResult<ReconciliationReport> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let mut report = ReconciliationReport::default();

            for candidate in tx.bookings_without_seats().await? {
                let booking_id = candidate.booking_id;
                // Re-check under the row lock; a concurrent writer may have moved on
                let Some(booking) = tx.lock_booking(booking_id).await? else {
                    continue;
                };
                if booking.is_cancelled() || !tx.booking_seat_numbers(booking_id).await?.is_empty() {
                    continue;
                }
                tx.delete_passengers(booking_id, None).await?;
                tx.set_booking_status(booking_id, BookingStatus::Cancelled).await?;
                report.cancelled_bookings.push(booking_id);
            }

            let stale = tx.stale_booked_seats().await?;
            if !stale.is_empty() {
                let mut by_booking: BTreeMap<i64, Vec<String>> = BTreeMap::new();
                for seat in &stale {
                    if let Some(owner) = seat.booking_id {
                        by_booking.entry(owner).or_default().push(seat.seat_number.clone());
                    }
                }
                let ids: Vec<i64> = stale.iter().map(|s| s.seat_id).collect();
                report.released_seats = tx.free_seats(&ids).await?;
                for (booking_id, seats) in &by_booking {
                    tx.delete_passengers(*booking_id, Some(seats)).await?;
                }
            }

            tx.commit().await?;
            if report.is_clean() {
                debug!("Reconciliation found nothing to repair");
            } else {
                info!(
                    cancelled_bookings = ?report.cancelled_bookings,
                    released_seats = report.released_seats,
                    "Reconciliation repaired inconsistent state"
                );
            }
            Ok(report)
        })
        .await
    }
}
