use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use skybook_core::seat::{normalize_seat_number, normalize_seat_numbers};
use skybook_core::{
    bounded, check_money_scale, Booking, BookingStatus, BookingView, CoreError, CoreResult, NewBooking, NewPassenger,
    Store, StoreTx,
};

use crate::inventory::{release_in, reserve_in};

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: i64,
    pub flight_id: i64,
    pub seat_numbers: Vec<String>,
    pub total_price: Decimal,
    pub passengers: Vec<NewPassenger>,
}

/// New seat set and/or passenger list for a booking. At least one must be set.
#[derive(Debug, Clone, Default)]
pub struct BookingChange {
    pub seat_numbers: Option<Vec<String>>,
    pub passengers: Option<Vec<NewPassenger>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelledBooking {
    pub booking: Booking,
    pub released_seats: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartialCancellation {
    pub booking: Booking,
    pub released_seats: Vec<String>,
    pub remaining_seats: Vec<String>,
}

fn check_text(field: &str, value: &str) -> CoreResult<()> {
    let len = value.chars().count();
    if !(2..=50).contains(&len) {
        return Err(CoreError::ValidationError(format!(
            "{} must be between 2 and 50 characters",
            field
        )));
    }
    Ok(())
}

/// Normalizes passengers and checks each sits in one of `seats`, one per seat.
fn check_passengers(passengers: &[NewPassenger], seats: &BTreeSet<String>) -> CoreResult<Vec<NewPassenger>> {
    let mut taken = BTreeSet::new();
    let mut checked = Vec::with_capacity(passengers.len());
    for p in passengers {
        let seat_number = normalize_seat_number(&p.seat_number)?;
        if !seats.contains(&seat_number) {
            return Err(CoreError::ValidationError(format!(
                "passenger seat {} is not part of the booking",
                seat_number
            )));
        }
        if !taken.insert(seat_number.clone()) {
            return Err(CoreError::ValidationError(format!(
                "seat {} has more than one passenger",
                seat_number
            )));
        }
        let passenger_name = p.passenger_name.trim().to_string();
        check_text("passenger_name", &passenger_name)?;
        if !(1..=120).contains(&p.age) {
            return Err(CoreError::ValidationError("age must be between 1 and 120".to_string()));
        }
        let relation = p.relation.as_deref().map(str::trim).map(str::to_string);
        if let Some(rel) = &relation {
            check_text("relation", rel)?;
        }
        checked.push(NewPassenger {
            seat_number,
            passenger_name,
            age: p.age,
            gender: p.gender,
            relation,
        });
    }
    Ok(checked)
}

async fn load_view(tx: &mut dyn StoreTx, booking: Booking) -> CoreResult<BookingView> {
    let seats = tx.booking_seat_numbers(booking.booking_id).await?;
    let passengers = tx.booking_passengers(booking.booking_id).await?;
    Ok(BookingView { booking, seats, passengers })
}

/// Booking lifecycle. Every operation reserves or releases seats in the same
/// unit of work as the booking row it touches.
#[derive(Clone)]
pub struct BookingLedger {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl BookingLedger {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Create a CONFIRMED booking holding the requested seats.
    ///
    /// If any seat is unavailable nothing is written.
    pub async fn create_booking(&self, request: BookingRequest) -> CoreResult<BookingView> {
        let seats = normalize_seat_numbers(&request.seat_numbers)?;
        if request.total_price < Decimal::ZERO {
            return Err(CoreError::ValidationError("total_price must not be negative".to_string()));
        }
        check_money_scale("total_price", request.total_price)?;
        let passengers = check_passengers(&request.passengers, &seats)?;

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_user(request.user_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("User {}", request.user_id)))?;
            tx.get_flight(request.flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", request.flight_id)))?;

            let booking = tx
                .insert_booking(&NewBooking {
                    user_id: request.user_id,
                    flight_id: request.flight_id,
                    total_price: request.total_price,
                    booking_status: BookingStatus::Confirmed,
                })
                .await?;
            reserve_in(tx.as_mut(), request.flight_id, &seats, booking.booking_id).await?;
            for passenger in &passengers {
                tx.insert_passenger(booking.booking_id, passenger).await?;
            }

            let view = load_view(tx.as_mut(), booking).await?;
            tx.commit().await?;
            info!(
                booking_id = view.booking.booking_id,
                user_id = view.booking.user_id,
                flight_id = view.booking.flight_id,
                seats = ?view.seats,
                "Booking confirmed"
            );
            Ok(view)
        })
        .await
    }

    /// Cancel a booking: its seats are released first, then the status flips to CANCELLED.
    pub async fn cancel_booking(&self, booking_id: i64) -> CoreResult<CancelledBooking> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let booking = tx
                .lock_booking(booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            if booking.is_cancelled() {
                return Err(CoreError::AlreadyCancelled(booking_id));
            }

            let released_seats = release_in(tx.as_mut(), booking_id, None).await?;
            tx.delete_passengers(booking_id, None).await?;
            let booking = tx
                .set_booking_status(booking_id, BookingStatus::Cancelled)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            tx.commit().await?;
            info!(booking_id, seats = ?released_seats, "Booking cancelled");
            Ok(CancelledBooking { booking, released_seats })
        })
        .await
    }

    /// Release some of a booking's seats. Releasing the last one cancels the booking.
    pub async fn cancel_specific_seats<I, S>(&self, booking_id: i64, seat_numbers: I) -> CoreResult<PartialCancellation>
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
                return Err(CoreError::AlreadyCancelled(booking_id));
            }

            let held: BTreeSet<String> = tx.booking_seat_numbers(booking_id).await?.into_iter().collect();
            let foreign: Vec<String> = wanted.difference(&held).cloned().collect();
            if !foreign.is_empty() {
                return Err(CoreError::InvalidArgument(format!(
                    "seats not held by booking {}: {}",
                    booking_id,
                    foreign.join(", ")
                )));
            }

            let released_seats = release_in(tx.as_mut(), booking_id, Some(&wanted)).await?;
            let remaining_seats: Vec<String> = held.difference(&wanted).cloned().collect();
            let status = if remaining_seats.is_empty() {
                BookingStatus::Cancelled
            } else {
                booking.booking_status
            };
            let booking = tx
                .set_booking_status(booking_id, status)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            tx.commit().await?;
            info!(
                booking_id,
                released = ?released_seats,
                remaining = remaining_seats.len(),
                status = %booking.booking_status,
                "Seats cancelled"
            );
            Ok(PartialCancellation { booking, released_seats, remaining_seats })
        })
        .await
    }

    /// Change a booking's seats and/or passengers.
    ///
    /// New seats are reserved before old ones are released, so a failed
    /// reservation leaves the booking exactly as it was. Seats present in both
    /// sets are kept.
    pub async fn modify_booking(&self, booking_id: i64, change: BookingChange) -> CoreResult<BookingView> {
        if change.seat_numbers.is_none() && change.passengers.is_none() {
            return Err(CoreError::InvalidArgument(
                "provide seat_numbers or passengers to modify".to_string(),
            ));
        }
        let new_seats = change
            .seat_numbers
            .as_ref()
            .map(normalize_seat_numbers)
            .transpose()?;

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let booking = tx
                .lock_booking(booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            if booking.is_cancelled() {
                return Err(CoreError::AlreadyCancelled(booking_id));
            }

            let held: BTreeSet<String> = tx.booking_seat_numbers(booking_id).await?.into_iter().collect();
            let final_seats = match &new_seats {
                Some(target) => {
                    let to_reserve: BTreeSet<String> = target.difference(&held).cloned().collect();
                    let to_release: BTreeSet<String> = held.difference(target).cloned().collect();
                    if !to_reserve.is_empty() {
                        reserve_in(tx.as_mut(), booking.flight_id, &to_reserve, booking_id).await?;
                    }
                    if !to_release.is_empty() {
                        release_in(tx.as_mut(), booking_id, Some(&to_release)).await?;
                    }
                    target.clone()
                }
                None => held,
            };

            if let Some(passengers) = &change.passengers {
                let passengers = check_passengers(passengers, &final_seats)?;
                tx.delete_passengers(booking_id, None).await?;
                for passenger in &passengers {
                    tx.insert_passenger(booking_id, passenger).await?;
                }
            }

            let booking = tx
                .set_booking_status(booking_id, booking.booking_status)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            let view = load_view(tx.as_mut(), booking).await?;
            tx.commit().await?;
            info!(booking_id, seats = ?view.seats, "Booking modified");
            Ok(view)
        })
        .await
    }

    pub async fn get_booking(&self, booking_id: i64) -> CoreResult<BookingView> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let booking = tx
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            load_view(tx.as_mut(), booking).await
        })
        .await
    }

    /// A user's bookings, newest first.
    pub async fn user_bookings(&self, user_id: i64) -> CoreResult<Vec<BookingView>> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            if tx.get_user(user_id).await?.is_none() {
                warn!(user_id, "Bookings requested for unknown user");
                return Err(CoreError::NotFound(format!("User {}", user_id)));
            }
            let bookings = tx.user_bookings(user_id).await?;
            let mut views = Vec::with_capacity(bookings.len());
            for booking in bookings {
                views.push(load_view(tx.as_mut(), booking).await?);
            }
            Ok(views)
        })
        .await
    }
}
