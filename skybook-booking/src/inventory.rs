use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use skybook_core::seat::{normalize_seat_number, normalize_seat_numbers};
use skybook_core::{
    bounded, BookingStatus, CoreError, CoreResult, NewSeat, NewSeatClass, Seat, SeatClass,
    SeatClassPatch, SeatPatch, Store, StoreTx,
};

/// Seats that moved to BOOKED in one reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedSeats {
    pub booking_id: i64,
    pub flight_id: i64,
    pub seats: Vec<String>,
}

/// Seats that moved back to AVAILABLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasedSeats {
    pub booking_id: i64,
    pub seats: Vec<String>,
    /// Set when the release left the booking without seats and it was cancelled.
    pub booking_cancelled: bool,
}

impl ReleasedSeats {
    pub fn count(&self) -> usize {
        self.seats.len()
    }
}

/// Moves every seat in `wanted` from AVAILABLE to BOOKED for `booking_id`, or
/// none of them.
///
/// The rows are locked first, so the availability check and the guarded
/// update observe the same state. Seat numbers unknown to the flight count as
/// conflicting. On error the caller must drop the unit of work.
pub(crate) async fn reserve_in(
    tx: &mut dyn StoreTx,
    flight_id: i64,
    wanted: &BTreeSet<String>,
    booking_id: i64,
) -> CoreResult<Vec<String>> {
    let numbers: Vec<String> = wanted.iter().cloned().collect();
    let locked = tx.lock_seats(flight_id, &numbers).await?;

    let mut conflicting: BTreeSet<String> = wanted.clone();
    for seat in &locked {
        if seat.is_available() {
            conflicting.remove(&seat.seat_number);
        }
    }
    if !conflicting.is_empty() {
        debug!(flight_id, booking_id, ?conflicting, "Reservation refused");
        return Err(CoreError::SeatUnavailable {
            conflicting_seats: conflicting.into_iter().collect(),
        });
    }

    let ids: Vec<i64> = locked.iter().map(|s| s.seat_id).collect();
    let changed = tx.book_seats(&ids, booking_id).await?;
    if changed != ids.len() as u64 {
        // Only reachable if the row locks were not honoured.
        return Err(CoreError::SeatUnavailable { conflicting_seats: numbers });
    }
    Ok(numbers)
}

/// Frees the booking's seats, restricted to `only` when given, and removes the
/// passengers sitting in them. Seats the booking does not hold are skipped.
pub(crate) async fn release_in(
    tx: &mut dyn StoreTx,
    booking_id: i64,
    only: Option<&BTreeSet<String>>,
) -> CoreResult<Vec<String>> {
    let held = tx.lock_booking_seats(booking_id).await?;
    let targets: Vec<&Seat> = held
        .iter()
        .filter(|s| only.map_or(true, |set| set.contains(&s.seat_number)))
        .collect();
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = targets.iter().map(|s| s.seat_id).collect();
    let mut numbers: Vec<String> = targets.iter().map(|s| s.seat_number.clone()).collect();
    numbers.sort();

    tx.free_seats(&ids).await?;
    tx.delete_passengers(booking_id, Some(&numbers)).await?;
    Ok(numbers)
}

/// Per-flight seat availability and the administrative seat catalog.
#[derive(Clone)]
pub struct SeatInventory {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl SeatInventory {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Reserve seats for an existing booking on the same flight. All or nothing.
    pub async fn reserve<I, S>(&self, flight_id: i64, seat_numbers: I, booking_id: i64) -> CoreResult<ReservedSeats>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted = normalize_seat_numbers(seat_numbers)?;

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let booking = tx
                .lock_booking(booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            if booking.is_cancelled() {
                return Err(CoreError::Conflict(format!("Booking {} is cancelled", booking_id)));
            }
            if booking.flight_id != flight_id {
                return Err(CoreError::InvalidArgument(format!(
                    "Booking {} belongs to flight {}, not {}",
                    booking_id, booking.flight_id, flight_id
                )));
            }

            let seats = reserve_in(tx.as_mut(), flight_id, &wanted, booking_id).await?;
            tx.commit().await?;
            info!(flight_id, booking_id, ?seats, "Seats reserved");
            Ok(ReservedSeats { booking_id, flight_id, seats })
        })
        .await
    }

    /// Release seats held by a booking.
    ///
    /// Idempotent: seats that are already AVAILABLE, or held by someone else,
    /// are left alone. A booking left without seats is cancelled.
    pub async fn release<I, S>(&self, booking_id: i64, seat_numbers: I) -> CoreResult<ReleasedSeats>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted = normalize_seat_numbers(seat_numbers)?;

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let booking = tx
                .lock_booking(booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;

            let seats = release_in(tx.as_mut(), booking_id, Some(&wanted)).await?;
            let mut booking_cancelled = false;
            if !seats.is_empty()
                && !booking.is_cancelled()
                && tx.booking_seat_numbers(booking_id).await?.is_empty()
            {
                tx.set_booking_status(booking_id, BookingStatus::Cancelled).await?;
                booking_cancelled = true;
            }
            tx.commit().await?;
            info!(booking_id, ?seats, booking_cancelled, "Seats released");
            Ok(ReleasedSeats { booking_id, seats, booking_cancelled })
        })
        .await
    }

    /// Seat numbers currently AVAILABLE on a flight. Stale as soon as it returns.
    pub async fn available_seats(&self, flight_id: i64) -> CoreResult<Vec<String>> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_flight(flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", flight_id)))?;
            Ok(tx.available_seat_numbers(flight_id).await?)
        })
        .await
    }

    /// Add a seat to a flight, up to its `total_seats`.
    pub async fn add_seat(&self, seat: NewSeat) -> CoreResult<Seat> {
        let seat = NewSeat {
            seat_number: normalize_seat_number(&seat.seat_number)?,
            ..seat
        };

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let flight = tx
                .lock_flight(seat.flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", seat.flight_id)))?;
            if let Some(class_id) = seat.class_id {
                tx.get_seat_class(class_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound(format!("Seat class {}", class_id)))?;
            }
            if tx.count_seats(flight.flight_id).await? >= i64::from(flight.total_seats) {
                return Err(CoreError::Conflict(format!(
                    "Flight {} already has all {} seats",
                    flight.flight_id, flight.total_seats
                )));
            }

            let created = tx.insert_seat(&seat).await.map_err(|e| {
                CoreError::conflict_on_constraint(
                    e,
                    format!("Seat {} already exists on flight {}", seat.seat_number, seat.flight_id),
                )
            })?;
            tx.commit().await?;
            info!(seat_id = created.seat_id, flight_id = created.flight_id, seat = %created.seat_number, "Seat added");
            Ok(created)
        })
        .await
    }

    /// Administrative edit of a seat's number or class. A BOOKED seat keeps its number.
    pub async fn update_seat_attributes(&self, seat_id: i64, patch: SeatPatch) -> CoreResult<Seat> {
        if patch.is_empty() {
            return Err(CoreError::InvalidArgument("at least one field must be provided".to_string()));
        }
        let patch = SeatPatch {
            seat_number: patch.seat_number.as_deref().map(normalize_seat_number).transpose()?,
            class_id: patch.class_id,
        };

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let seat = tx
                .lock_seat(seat_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Seat {}", seat_id)))?;

            if let Some(number) = &patch.seat_number {
                if number != &seat.seat_number && !seat.is_available() {
                    return Err(CoreError::Conflict(format!(
                        "Seat {} is booked and cannot be renumbered",
                        seat.seat_number
                    )));
                }
            }
            if let Some(class_id) = patch.class_id {
                tx.get_seat_class(class_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound(format!("Seat class {}", class_id)))?;
            }

            let updated = tx
                .update_seat(seat_id, &patch)
                .await
                .map_err(|e| CoreError::conflict_on_constraint(e, "Seat number already exists on this flight"))?
                .ok_or_else(|| CoreError::NotFound(format!("Seat {}", seat_id)))?;
            tx.commit().await?;
            info!(seat_id, "Seat updated");
            Ok(updated)
        })
        .await
    }

    pub async fn delete_seat(&self, seat_id: i64) -> CoreResult<()> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let seat = tx
                .lock_seat(seat_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Seat {}", seat_id)))?;
            if !seat.is_available() {
                return Err(CoreError::Conflict(format!("Seat {} is booked", seat.seat_number)));
            }
            tx.delete_seat(seat_id).await?;
            tx.commit().await?;
            info!(seat_id, "Seat deleted");
            Ok(())
        })
        .await
    }

    pub async fn add_seat_class(&self, class: NewSeatClass) -> CoreResult<SeatClass> {
        let class = NewSeatClass {
            class_name: class.class_name.trim().to_string(),
            price_multiplier: class.price_multiplier,
        };
        check_class_fields(Some(&class.class_name), Some(class.price_multiplier))?;

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let created = tx.insert_seat_class(&class).await.map_err(|e| {
                CoreError::conflict_on_constraint(e, format!("Seat class {} already exists", class.class_name))
            })?;
            tx.commit().await?;
            info!(class_id = created.class_id, "Seat class created");
            Ok(created)
        })
        .await
    }

    pub async fn get_seat_class(&self, class_id: i64) -> CoreResult<SeatClass> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_seat_class(class_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Seat class {}", class_id)))
        })
        .await
    }

    pub async fn list_seat_classes(&self) -> CoreResult<Vec<SeatClass>> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            Ok(tx.list_seat_classes().await?)
        })
        .await
    }

    pub async fn update_seat_class(&self, class_id: i64, patch: SeatClassPatch) -> CoreResult<SeatClass> {
        if patch.is_empty() {
            return Err(CoreError::InvalidArgument("at least one field must be provided".to_string()));
        }
        let patch = SeatClassPatch {
            class_name: patch.class_name.map(|n| n.trim().to_string()),
            price_multiplier: patch.price_multiplier,
        };
        check_class_fields(patch.class_name.as_deref(), patch.price_multiplier)?;

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let updated = tx
                .update_seat_class(class_id, &patch)
                .await
                .map_err(|e| CoreError::conflict_on_constraint(e, "Seat class name already exists"))?
                .ok_or_else(|| CoreError::NotFound(format!("Seat class {}", class_id)))?;
            tx.commit().await?;
            Ok(updated)
        })
        .await
    }

    /// Remove a seat class that no seat refers to.
    pub async fn delete_seat_class(&self, class_id: i64) -> CoreResult<()> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let deleted = tx.delete_seat_class(class_id).await.map_err(|e| {
                CoreError::conflict_on_constraint(e, format!("Seat class {} is still assigned to seats", class_id))
            })?;
            if !deleted {
                return Err(CoreError::NotFound(format!("Seat class {}", class_id)));
            }
            tx.commit().await?;
            info!(class_id, "Seat class deleted");
            Ok(())
        })
        .await
    }
}

fn check_class_fields(class_name: Option<&str>, multiplier: Option<Decimal>) -> CoreResult<()> {
    if class_name.is_some_and(str::is_empty) {
        return Err(CoreError::ValidationError("class_name must not be blank".to_string()));
    }
    if multiplier.is_some_and(|m| m <= Decimal::ZERO) {
        return Err(CoreError::ValidationError("price_multiplier must be greater than 0".to_string()));
    }
    Ok(())
}
