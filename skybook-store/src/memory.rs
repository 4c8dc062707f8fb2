use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use skybook_core::repository::{Store, StoreError, StoreResult, StoreTx};
use skybook_core::{
    Booking, BookingStatus, Flight, FlightPatch, FlightRoute, NewBooking, NewFlight,
    NewPassenger, NewPayment, NewRoute, NewSeat, NewSeatClass, NewUser, PageRequest, Passenger,
    Payment, PaymentStatus, RouteSearch, Seat, SeatClass, SeatClassPatch, SeatPatch, SeatStatus,
    User, UserPatch,
};

/// In-process [`Store`] used by tests and the `memory` backend.
///
/// A unit of work holds the table lock from `begin` until it ends and writes
/// into a private copy, so units of work are fully serialized and an
/// uncommitted one leaves no trace. Unique and foreign-key constraints mirror
/// the Postgres schema.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

#[derive(Clone, Default)]
struct Sequences {
    user: i64,
    flight: i64,
    route: i64,
    seat_class: i64,
    seat: i64,
    booking: i64,
    passenger: i64,
    payment: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Clone, Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    flights: BTreeMap<i64, Flight>,
    routes: BTreeMap<i64, FlightRoute>,
    seat_classes: BTreeMap<i64, SeatClass>,
    seats: BTreeMap<i64, Seat>,
    bookings: BTreeMap<i64, Booking>,
    passengers: BTreeMap<i64, Passenger>,
    payments: BTreeMap<i64, Payment>,
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation(constraint.to_string())
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation(constraint.to_string())
}

fn paginate<T: Clone>(items: impl Iterator<Item = T>, page: &PageRequest) -> Vec<T> {
    items
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.user_id) != except && u.email.eq_ignore_ascii_case(email))
    }

    fn seat_number_taken(&self, flight_id: i64, seat_number: &str, except: Option<i64>) -> bool {
        self.seats.values().any(|s| {
            Some(s.seat_id) != except && s.flight_id == flight_id && s.seat_number == seat_number
        })
    }

    fn matching_routes<'a>(&'a self, search: &'a RouteSearch) -> Vec<&'a FlightRoute> {
        let mut routes: Vec<_> = self.routes.values().filter(|r| search.matches(r)).collect();
        routes.sort_by_key(|r| (r.departure_time, r.route_id));
        routes
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let t = &mut self.work;
        if t.email_taken(&user.email, None) {
            return Err(unique("users_email_key"));
        }
        let row = User {
            user_id: next(&mut t.seq.user),
            name: user.name.clone(),
            age: user.age,
            gender: user.gender,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            phone: user.phone.clone(),
            user_role: user.user_role,
            created_at: Utc::now(),
        };
        t.users.insert(row.user_id, row.clone());
        Ok(row)
    }

    async fn get_user(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.work.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .work
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&mut self, user_id: i64, patch: &UserPatch) -> StoreResult<Option<User>> {
        let t = &mut self.work;
        if let Some(email) = &patch.email {
            if t.email_taken(email, Some(user_id)) {
                return Err(unique("users_email_key"));
            }
        }
        Ok(t.users.get_mut(&user_id).map(|user| {
            patch.apply(user);
            user.clone()
        }))
    }

    async fn list_users(&mut self, page: &PageRequest) -> StoreResult<Vec<User>> {
        Ok(paginate(self.work.users.values().cloned(), page))
    }

    async fn count_users(&mut self) -> StoreResult<i64> {
        Ok(self.work.users.len() as i64)
    }

    async fn insert_flight(&mut self, flight: &NewFlight) -> StoreResult<Flight> {
        let t = &mut self.work;
        if t.flights.values().any(|f| f.flight_number == flight.flight_number) {
            return Err(unique("flights_flight_number_key"));
        }
        let row = Flight {
            flight_id: next(&mut t.seq.flight),
            airline: flight.airline.clone(),
            flight_number: flight.flight_number.clone(),
            total_seats: flight.total_seats,
            created_at: Utc::now(),
        };
        t.flights.insert(row.flight_id, row.clone());
        Ok(row)
    }

    async fn get_flight(&mut self, flight_id: i64) -> StoreResult<Option<Flight>> {
        Ok(self.work.flights.get(&flight_id).cloned())
    }

    async fn lock_flight(&mut self, flight_id: i64) -> StoreResult<Option<Flight>> {
        self.get_flight(flight_id).await
    }

    async fn list_flights(&mut self, page: &PageRequest) -> StoreResult<Vec<Flight>> {
        Ok(paginate(self.work.flights.values().cloned(), page))
    }

    async fn count_flights(&mut self) -> StoreResult<i64> {
        Ok(self.work.flights.len() as i64)
    }

    async fn update_flight(&mut self, flight_id: i64, patch: &FlightPatch) -> StoreResult<Option<Flight>> {
        let t = &mut self.work;
        if let Some(number) = &patch.flight_number {
            if t
                .flights
                .values()
                .any(|f| f.flight_id != flight_id && &f.flight_number == number)
            {
                return Err(unique("flights_flight_number_key"));
            }
        }
        Ok(t.flights.get_mut(&flight_id).map(|flight| {
            patch.apply(flight);
            flight.clone()
        }))
    }

    async fn delete_flight(&mut self, flight_id: i64) -> StoreResult<bool> {
        let t = &mut self.work;
        if !t.flights.contains_key(&flight_id) {
            return Ok(false);
        }
        if t.bookings.values().any(|b| b.flight_id == flight_id) {
            return Err(foreign_key("bookings_flight_id_fkey"));
        }
        t.seats.retain(|_, s| s.flight_id != flight_id);
        t.routes.retain(|_, r| r.flight_id != flight_id);
        t.flights.remove(&flight_id);
        Ok(true)
    }

    async fn insert_route(&mut self, route: &NewRoute) -> StoreResult<FlightRoute> {
        let t = &mut self.work;
        if !t.flights.contains_key(&route.flight_id) {
            return Err(foreign_key("flight_routes_flight_id_fkey"));
        }
        let row = FlightRoute {
            route_id: next(&mut t.seq.route),
            flight_id: route.flight_id,
            departure_city: route.departure_city.clone(),
            arrival_city: route.arrival_city.clone(),
            departure_time: route.departure_time,
            arrival_time: route.arrival_time,
            base_price: route.base_price,
            gst: route.gst,
            total_price: route.total_price,
        };
        t.routes.insert(row.route_id, row.clone());
        Ok(row)
    }

    async fn get_route(&mut self, route_id: i64) -> StoreResult<Option<FlightRoute>> {
        Ok(self.work.routes.get(&route_id).cloned())
    }

    async fn update_route(&mut self, route: &FlightRoute) -> StoreResult<Option<FlightRoute>> {
        Ok(self.work.routes.get_mut(&route.route_id).map(|stored| {
            // flight_id is not updatable
            let flight_id = stored.flight_id;
            *stored = FlightRoute { flight_id, ..route.clone() };
            stored.clone()
        }))
    }

    async fn delete_route(&mut self, route_id: i64) -> StoreResult<bool> {
        Ok(self.work.routes.remove(&route_id).is_some())
    }

    async fn search_routes(&mut self, search: &RouteSearch, page: &PageRequest) -> StoreResult<Vec<FlightRoute>> {
        let routes = self.work.matching_routes(search);
        Ok(paginate(routes.into_iter().cloned(), page))
    }

    async fn count_routes(&mut self, search: &RouteSearch) -> StoreResult<i64> {
        Ok(self.work.matching_routes(search).len() as i64)
    }

    async fn insert_seat_class(&mut self, class: &NewSeatClass) -> StoreResult<SeatClass> {
        let t = &mut self.work;
        if t.seat_classes.values().any(|c| c.class_name == class.class_name) {
            return Err(unique("seat_classes_class_name_key"));
        }
        let row = SeatClass {
            class_id: next(&mut t.seq.seat_class),
            class_name: class.class_name.clone(),
            price_multiplier: class.price_multiplier,
        };
        t.seat_classes.insert(row.class_id, row.clone());
        Ok(row)
    }

    async fn get_seat_class(&mut self, class_id: i64) -> StoreResult<Option<SeatClass>> {
        Ok(self.work.seat_classes.get(&class_id).cloned())
    }

    async fn list_seat_classes(&mut self) -> StoreResult<Vec<SeatClass>> {
        Ok(self.work.seat_classes.values().cloned().collect())
    }

    async fn update_seat_class(&mut self, class_id: i64, patch: &SeatClassPatch) -> StoreResult<Option<SeatClass>> {
        let t = &mut self.work;
        if let Some(name) = &patch.class_name {
            if t
                .seat_classes
                .values()
                .any(|c| c.class_id != class_id && &c.class_name == name)
            {
                return Err(unique("seat_classes_class_name_key"));
            }
        }
        Ok(t.seat_classes.get_mut(&class_id).map(|class| {
            if let Some(name) = &patch.class_name {
                class.class_name = name.clone();
            }
            if let Some(multiplier) = patch.price_multiplier {
                class.price_multiplier = multiplier;
            }
            class.clone()
        }))
    }

    async fn delete_seat_class(&mut self, class_id: i64) -> StoreResult<bool> {
        let t = &mut self.work;
        if t.seats.values().any(|s| s.class_id == Some(class_id)) {
            return Err(foreign_key("seats_class_id_fkey"));
        }
        Ok(t.seat_classes.remove(&class_id).is_some())
    }

    async fn insert_seat(&mut self, seat: &NewSeat) -> StoreResult<Seat> {
        let t = &mut self.work;
        if !t.flights.contains_key(&seat.flight_id) {
            return Err(foreign_key("seats_flight_id_fkey"));
        }
        if let Some(class_id) = seat.class_id {
            if !t.seat_classes.contains_key(&class_id) {
                return Err(foreign_key("seats_class_id_fkey"));
            }
        }
        if t.seat_number_taken(seat.flight_id, &seat.seat_number, None) {
            return Err(unique("seats_flight_seat_number_key"));
        }
        let row = Seat {
            seat_id: next(&mut t.seq.seat),
            flight_id: seat.flight_id,
            seat_number: seat.seat_number.clone(),
            class_id: seat.class_id,
            status: SeatStatus::Available,
            booking_id: None,
        };
        t.seats.insert(row.seat_id, row.clone());
        Ok(row)
    }

    async fn get_seat(&mut self, seat_id: i64) -> StoreResult<Option<Seat>> {
        Ok(self.work.seats.get(&seat_id).cloned())
    }

    async fn lock_seat(&mut self, seat_id: i64) -> StoreResult<Option<Seat>> {
        self.get_seat(seat_id).await
    }

    async fn update_seat(&mut self, seat_id: i64, patch: &SeatPatch) -> StoreResult<Option<Seat>> {
        let t = &mut self.work;
        let Some(flight_id) = t.seats.get(&seat_id).map(|s| s.flight_id) else {
            return Ok(None);
        };
        if let Some(number) = &patch.seat_number {
            if t.seat_number_taken(flight_id, number, Some(seat_id)) {
                return Err(unique("seats_flight_seat_number_key"));
            }
        }
        if let Some(class_id) = patch.class_id {
            if !t.seat_classes.contains_key(&class_id) {
                return Err(foreign_key("seats_class_id_fkey"));
            }
        }
        Ok(t.seats.get_mut(&seat_id).map(|seat| {
            if let Some(number) = &patch.seat_number {
                seat.seat_number = number.clone();
            }
            if patch.class_id.is_some() {
                seat.class_id = patch.class_id;
            }
            seat.clone()
        }))
    }

    async fn delete_seat(&mut self, seat_id: i64) -> StoreResult<bool> {
        Ok(self.work.seats.remove(&seat_id).is_some())
    }

    async fn count_seats(&mut self, flight_id: i64) -> StoreResult<i64> {
        Ok(self.work.seats.values().filter(|s| s.flight_id == flight_id).count() as i64)
    }

    async fn count_booked_seats(&mut self, flight_id: i64) -> StoreResult<i64> {
        Ok(self
            .work
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id && s.status == SeatStatus::Booked)
            .count() as i64)
    }

    async fn available_seat_numbers(&mut self, flight_id: i64) -> StoreResult<Vec<String>> {
        let mut seats: Vec<String> = self
            .work
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id && s.is_available())
            .map(|s| s.seat_number.clone())
            .collect();
        seats.sort();
        Ok(seats)
    }

    async fn lock_seats(&mut self, flight_id: i64, seat_numbers: &[String]) -> StoreResult<Vec<Seat>> {
        Ok(self
            .work
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id && seat_numbers.contains(&s.seat_number))
            .cloned()
            .collect())
    }

    async fn lock_booking_seats(&mut self, booking_id: i64) -> StoreResult<Vec<Seat>> {
        Ok(self
            .work
            .seats
            .values()
            .filter(|s| s.booking_id == Some(booking_id))
            .cloned()
            .collect())
    }

    async fn book_seats(&mut self, seat_ids: &[i64], booking_id: i64) -> StoreResult<u64> {
        let t = &mut self.work;
        if !t.bookings.contains_key(&booking_id) {
            return Err(foreign_key("seats_booking_id_fkey"));
        }
        let mut changed = 0;
        for seat_id in seat_ids {
            if let Some(seat) = t.seats.get_mut(seat_id) {
                if seat.is_available() {
                    seat.status = SeatStatus::Booked;
                    seat.booking_id = Some(booking_id);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn free_seats(&mut self, seat_ids: &[i64]) -> StoreResult<u64> {
        let mut changed = 0;
        for seat_id in seat_ids {
            if let Some(seat) = self.work.seats.get_mut(seat_id) {
                if seat.status == SeatStatus::Booked {
                    seat.status = SeatStatus::Available;
                    seat.booking_id = None;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn booking_seat_numbers(&mut self, booking_id: i64) -> StoreResult<Vec<String>> {
        let mut seats: Vec<String> = self
            .work
            .seats
            .values()
            .filter(|s| s.booking_id == Some(booking_id))
            .map(|s| s.seat_number.clone())
            .collect();
        seats.sort();
        Ok(seats)
    }

    async fn stale_booked_seats(&mut self) -> StoreResult<Vec<Seat>> {
        let t = &self.work;
        Ok(t.seats
            .values()
            .filter(|s| {
                s.status == SeatStatus::Booked
                    && s
                        .booking_id
                        .and_then(|id| t.bookings.get(&id))
                        .is_some_and(Booking::is_cancelled)
            })
            .cloned()
            .collect())
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Booking> {
        let t = &mut self.work;
        if !t.users.contains_key(&booking.user_id) {
            return Err(foreign_key("bookings_user_id_fkey"));
        }
        if !t.flights.contains_key(&booking.flight_id) {
            return Err(foreign_key("bookings_flight_id_fkey"));
        }
        let now = Utc::now();
        let row = Booking {
            booking_id: next(&mut t.seq.booking),
            user_id: booking.user_id,
            flight_id: booking.flight_id,
            total_price: booking.total_price,
            booking_status: booking.booking_status,
            created_at: now,
            updated_at: now,
        };
        t.bookings.insert(row.booking_id, row.clone());
        Ok(row)
    }

    async fn get_booking(&mut self, booking_id: i64) -> StoreResult<Option<Booking>> {
        Ok(self.work.bookings.get(&booking_id).cloned())
    }

    async fn lock_booking(&mut self, booking_id: i64) -> StoreResult<Option<Booking>> {
        self.get_booking(booking_id).await
    }

    async fn set_booking_status(&mut self, booking_id: i64, status: BookingStatus) -> StoreResult<Option<Booking>> {
        Ok(self.work.bookings.get_mut(&booking_id).map(|booking| {
            booking.booking_status = status;
            booking.updated_at = Utc::now();
            booking.clone()
        }))
    }

    async fn user_bookings(&mut self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .work
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.booking_id.cmp(&a.booking_id))
        });
        Ok(bookings)
    }

    async fn count_flight_bookings(&mut self, flight_id: i64) -> StoreResult<i64> {
        Ok(self
            .work
            .bookings
            .values()
            .filter(|b| b.flight_id == flight_id)
            .count() as i64)
    }

    async fn bookings_without_seats(&mut self) -> StoreResult<Vec<Booking>> {
        let t = &self.work;
        Ok(t.bookings
            .values()
            .filter(|b| {
                !b.is_cancelled()
                    && !t.seats.values().any(|s| s.booking_id == Some(b.booking_id))
            })
            .cloned()
            .collect())
    }

    async fn insert_passenger(&mut self, booking_id: i64, passenger: &NewPassenger) -> StoreResult<Passenger> {
        let t = &mut self.work;
        if !t.bookings.contains_key(&booking_id) {
            return Err(foreign_key("passengers_booking_id_fkey"));
        }
        if t
            .passengers
            .values()
            .any(|p| p.booking_id == booking_id && p.seat_number == passenger.seat_number)
        {
            return Err(unique("passengers_booking_seat_key"));
        }
        let row = Passenger {
            passenger_id: next(&mut t.seq.passenger),
            booking_id,
            seat_number: passenger.seat_number.clone(),
            passenger_name: passenger.passenger_name.clone(),
            age: passenger.age,
            gender: passenger.gender,
            relation: passenger.relation.clone(),
        };
        t.passengers.insert(row.passenger_id, row.clone());
        Ok(row)
    }

    async fn booking_passengers(&mut self, booking_id: i64) -> StoreResult<Vec<Passenger>> {
        let mut passengers: Vec<Passenger> = self
            .work
            .passengers
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        passengers.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));
        Ok(passengers)
    }

    async fn delete_passengers(&mut self, booking_id: i64, seat_numbers: Option<&[String]>) -> StoreResult<u64> {
        let before = self.work.passengers.len();
        self.work.passengers.retain(|_, p| {
            let targeted = p.booking_id == booking_id
                && seat_numbers.map_or(true, |seats| seats.contains(&p.seat_number));
            !targeted
        });
        Ok((before - self.work.passengers.len()) as u64)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> StoreResult<Payment> {
        let t = &mut self.work;
        if !t.bookings.contains_key(&payment.booking_id) {
            return Err(foreign_key("payments_booking_id_fkey"));
        }
        if !t.users.contains_key(&payment.user_id) {
            return Err(foreign_key("payments_user_id_fkey"));
        }
        let row = Payment {
            payment_id: next(&mut t.seq.payment),
            booking_id: payment.booking_id,
            user_id: payment.user_id,
            amount: payment.amount,
            payment_status: payment.payment_status,
            payment_date: payment.payment_date,
        };
        t.payments.insert(row.payment_id, row.clone());
        Ok(row)
    }

    async fn get_payment(&mut self, payment_id: i64) -> StoreResult<Option<Payment>> {
        Ok(self.work.payments.get(&payment_id).cloned())
    }

    async fn set_payment_status(&mut self, payment_id: i64, status: PaymentStatus) -> StoreResult<Option<Payment>> {
        Ok(self.work.payments.get_mut(&payment_id).map(|payment| {
            payment.payment_status = status;
            payment.clone()
        }))
    }

    async fn delete_payment(&mut self, payment_id: i64) -> StoreResult<bool> {
        Ok(self.work.payments.remove(&payment_id).is_some())
    }

    async fn booking_payments(&mut self, booking_id: i64) -> StoreResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .work
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.payment_date, p.payment_id));
        Ok(payments)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
