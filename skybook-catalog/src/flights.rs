use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use skybook_core::{
    bounded, CoreError, CoreResult, Flight, FlightPatch, NewFlight, Page, PageRequest, Store,
};

/// Admin-facing flight catalog.
#[derive(Clone)]
pub struct FlightCatalog {
    store: Arc<dyn Store>,
    timeout: Duration,
}

fn check_flight_fields(airline: Option<&str>, flight_number: Option<&str>, total_seats: Option<i32>) -> CoreResult<()> {
    if airline.is_some_and(|a| a.trim().is_empty()) {
        return Err(CoreError::ValidationError("airline must not be blank".to_string()));
    }
    if flight_number.is_some_and(|n| n.trim().is_empty()) {
        return Err(CoreError::ValidationError("flight_number must not be blank".to_string()));
    }
    if total_seats.is_some_and(|t| t <= 0) {
        return Err(CoreError::ValidationError("total_seats must be greater than 0".to_string()));
    }
    Ok(())
}

impl FlightCatalog {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Register a new flight
    pub async fn add_flight(&self, flight: NewFlight) -> CoreResult<Flight> {
        check_flight_fields(Some(&flight.airline), Some(&flight.flight_number), Some(flight.total_seats))?;
        let flight = NewFlight {
            airline: flight.airline.trim().to_string(),
            flight_number: flight.flight_number.trim().to_string(),
            total_seats: flight.total_seats,
        };

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let created = tx.insert_flight(&flight).await.map_err(|e| {
                CoreError::conflict_on_constraint(
                    e,
                    format!("Flight number {} already exists", flight.flight_number),
                )
            })?;
            tx.commit().await?;
            info!(flight_id = created.flight_id, flight_number = %created.flight_number, "Flight created");
            Ok(created)
        })
        .await
    }

    pub async fn get_flight(&self, flight_id: i64) -> CoreResult<Flight> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_flight(flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", flight_id)))
        })
        .await
    }

    pub async fn list_flights(&self, page: PageRequest) -> CoreResult<Page<Flight>> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let total = tx.count_flights().await?;
            let items = tx.list_flights(&page).await?;
            Ok(Page::new(items, page, total))
        })
        .await
    }

    /// Partial update.
    ///
    /// `total_seats` cannot shrink below the seat rows already created, and the
    /// flight number is frozen once any seat has been sold.
    pub async fn update_flight(&self, flight_id: i64, patch: FlightPatch) -> CoreResult<Flight> {
        if patch.is_empty() {
            return Err(CoreError::InvalidArgument("at least one field must be provided".to_string()));
        }
        check_flight_fields(patch.airline.as_deref(), patch.flight_number.as_deref(), patch.total_seats)?;
        let patch = FlightPatch {
            airline: patch.airline.map(|a| a.trim().to_string()),
            flight_number: patch.flight_number.map(|n| n.trim().to_string()),
            total_seats: patch.total_seats,
        };

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let current = tx
                .lock_flight(flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", flight_id)))?;

            if let Some(total) = patch.total_seats {
                let existing = tx.count_seats(flight_id).await?;
                if i64::from(total) < existing {
                    return Err(CoreError::Conflict(format!(
                        "Flight {} already has {} seats; total_seats cannot be {}",
                        flight_id, existing, total
                    )));
                }
            }
            if let Some(number) = &patch.flight_number {
                if number != &current.flight_number && tx.count_booked_seats(flight_id).await? > 0 {
                    return Err(CoreError::Conflict(format!(
                        "Flight {} has sold seats; its flight number cannot change",
                        flight_id
                    )));
                }
            }

            let updated = tx
                .update_flight(flight_id, &patch)
                .await
                .map_err(|e| CoreError::conflict_on_constraint(e, "Flight number already exists"))?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", flight_id)))?;
            tx.commit().await?;
            info!(flight_id, "Flight updated");
            Ok(updated)
        })
        .await
    }

    /// Delete a flight together with its seats and routes. Refused while any booking references it.
    pub async fn delete_flight(&self, flight_id: i64) -> CoreResult<()> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.lock_flight(flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", flight_id)))?;

            if tx.count_flight_bookings(flight_id).await? > 0 {
                return Err(CoreError::Conflict(format!("Flight {} has bookings", flight_id)));
            }
            tx.delete_flight(flight_id)
                .await
                .map_err(|e| CoreError::conflict_on_constraint(e, format!("Flight {} has bookings", flight_id)))?;
            tx.commit().await?;
            info!(flight_id, "Flight deleted");
            Ok(())
        })
        .await
    }
}
