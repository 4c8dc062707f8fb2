use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;
use tracing::debug;

use skybook_core::repository::{Store, StoreError, StoreResult, StoreTx};
use skybook_core::{
    Booking, BookingStatus, Flight, FlightPatch, FlightRoute, NewBooking, NewFlight,
    NewPassenger, NewPayment, NewRoute, NewSeat, NewSeatClass, NewUser, PageRequest, Passenger,
    Payment, PaymentStatus, RouteSearch, Seat, SeatClass, SeatClassPatch, SeatPatch, User,
    UserPatch, UnknownVariant,
};

use crate::database::{map_sqlx_error, DbClient};

macro_rules! user_columns {
    () => {
        "user_id, name, age, gender, email, password_hash, phone, user_role, created_at"
    };
}

macro_rules! flight_columns {
    () => {
        "flight_id, airline, flight_number, total_seats, created_at"
    };
}

macro_rules! route_columns {
    () => {
        "route_id, flight_id, departure_city, arrival_city, departure_time, arrival_time, base_price, gst, total_price"
    };
}

macro_rules! seat_columns {
    () => {
        "seat_id, flight_id, seat_number, class_id, status, booking_id"
    };
}

macro_rules! booking_columns {
    () => {
        "booking_id, user_id, flight_id, total_price, booking_status, created_at, updated_at"
    };
}

macro_rules! passenger_columns {
    () => {
        "passenger_id, booking_id, seat_number, passenger_name, age, gender, relation"
    };
}

macro_rules! payment_columns {
    () => {
        "payment_id, booking_id, user_id, amount, payment_status, payment_date"
    };
}

/// Postgres-backed [`Store`]. Each unit of work is one database transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_client(client: &DbClient) -> Self {
        Self::new(client.pool.clone())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn parse<T>(value: &str) -> StoreResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value.parse().map_err(|e: UnknownVariant| StoreError::Backend(e.to_string()))
}

// Internal row structs; enum columns are stored as TEXT
#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: i64,
    name: String,
    age: i32,
    gender: String,
    email: String,
    password_hash: String,
    phone: String,
    user_role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(User {
            user_id: row.user_id,
            name: row.name,
            age: row.age,
            gender: parse(&row.gender)?,
            email: row.email,
            password_hash: row.password_hash,
            phone: row.phone,
            user_role: parse(&row.user_role)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    flight_id: i64,
    airline: String,
    flight_number: String,
    total_seats: i32,
    created_at: DateTime<Utc>,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            flight_id: row.flight_id,
            airline: row.airline,
            flight_number: row.flight_number,
            total_seats: row.total_seats,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    route_id: i64,
    flight_id: i64,
    departure_city: String,
    arrival_city: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    base_price: Decimal,
    gst: Decimal,
    total_price: Decimal,
}

impl From<RouteRow> for FlightRoute {
    fn from(row: RouteRow) -> Self {
        FlightRoute {
            route_id: row.route_id,
            flight_id: row.flight_id,
            departure_city: row.departure_city,
            arrival_city: row.arrival_city,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            base_price: row.base_price,
            gst: row.gst,
            total_price: row.total_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SeatClassRow {
    class_id: i64,
    class_name: String,
    price_multiplier: Decimal,
}

impl From<SeatClassRow> for SeatClass {
    fn from(row: SeatClassRow) -> Self {
        SeatClass {
            class_id: row.class_id,
            class_name: row.class_name,
            price_multiplier: row.price_multiplier,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    seat_id: i64,
    flight_id: i64,
    seat_number: String,
    class_id: Option<i64>,
    status: String,
    booking_id: Option<i64>,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> StoreResult<Self> {
        Ok(Seat {
            seat_id: row.seat_id,
            flight_id: row.flight_id,
            seat_number: row.seat_number,
            class_id: row.class_id,
            status: parse(&row.status)?,
            booking_id: row.booking_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_id: i64,
    user_id: i64,
    flight_id: i64,
    total_price: Decimal,
    booking_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> StoreResult<Self> {
        Ok(Booking {
            booking_id: row.booking_id,
            user_id: row.user_id,
            flight_id: row.flight_id,
            total_price: row.total_price,
            booking_status: parse(&row.booking_status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    passenger_id: i64,
    booking_id: i64,
    seat_number: String,
    passenger_name: String,
    age: i32,
    gender: String,
    relation: Option<String>,
}

impl TryFrom<PassengerRow> for Passenger {
    type Error = StoreError;

    fn try_from(row: PassengerRow) -> StoreResult<Self> {
        Ok(Passenger {
            passenger_id: row.passenger_id,
            booking_id: row.booking_id,
            seat_number: row.seat_number,
            passenger_name: row.passenger_name,
            age: row.age,
            gender: parse(&row.gender)?,
            relation: row.relation,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    payment_id: i64,
    booking_id: i64,
    user_id: i64,
    amount: Decimal,
    payment_status: String,
    payment_date: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> StoreResult<Self> {
        Ok(Payment {
            payment_id: row.payment_id,
            booking_id: row.booking_id,
            user_id: row.user_id,
            amount: row.amount,
            payment_status: parse(&row.payment_status)?,
            payment_date: row.payment_date,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn convert_opt<R, T>(row: Option<R>) -> StoreResult<Option<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    row.map(T::try_from).transpose()
}

/// Half-open UTC window covering the search date.
fn day_bounds(search: &RouteSearch) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = search.date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO users (name, age, gender, email, password_hash, phone, user_role) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            user_columns!()
        ))
        .bind(&user.name)
        .bind(user.age)
        .bind(user.gender.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.user_role.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn get_user(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ", user_columns!(), " FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ", user_columns!(), " FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn update_user(&mut self, user_id: i64, patch: &UserPatch) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET ",
            "name = COALESCE($2, name), age = COALESCE($3, age), gender = COALESCE($4, gender), ",
            "email = COALESCE($5, email), password_hash = COALESCE($6, password_hash), ",
            "phone = COALESCE($7, phone) ",
            "WHERE user_id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(user_id)
        .bind(patch.name.as_deref())
        .bind(patch.age)
        .bind(patch.gender.map(|g| g.as_str()))
        .bind(patch.email.as_deref())
        .bind(patch.password_hash.as_deref())
        .bind(patch.phone.as_deref())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn list_users(&mut self, page: &PageRequest) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ", user_columns!(), " FROM users ORDER BY user_id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn count_users(&mut self) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert_flight(&mut self, flight: &NewFlight) -> StoreResult<Flight> {
        let row = sqlx::query_as::<_, FlightRow>(concat!(
            "INSERT INTO flights (airline, flight_number, total_seats) VALUES ($1, $2, $3) RETURNING ",
            flight_columns!()
        ))
        .bind(&flight.airline)
        .bind(&flight.flight_number)
        .bind(flight.total_seats)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn get_flight(&mut self, flight_id: i64) -> StoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(concat!(
            "SELECT ", flight_columns!(), " FROM flights WHERE flight_id = $1"
        ))
        .bind(flight_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Flight::from))
    }

    async fn lock_flight(&mut self, flight_id: i64) -> StoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(concat!(
            "SELECT ", flight_columns!(), " FROM flights WHERE flight_id = $1 FOR UPDATE"
        ))
        .bind(flight_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Flight::from))
    }

    async fn list_flights(&mut self, page: &PageRequest) -> StoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(concat!(
            "SELECT ", flight_columns!(), " FROM flights ORDER BY flight_id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn count_flights(&mut self) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM flights")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn update_flight(&mut self, flight_id: i64, patch: &FlightPatch) -> StoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(concat!(
            "UPDATE flights SET airline = COALESCE($2, airline), ",
            "flight_number = COALESCE($3, flight_number), total_seats = COALESCE($4, total_seats) ",
            "WHERE flight_id = $1 RETURNING ",
            flight_columns!()
        ))
        .bind(flight_id)
        .bind(patch.airline.as_deref())
        .bind(patch.flight_number.as_deref())
        .bind(patch.total_seats)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Flight::from))
    }

    async fn delete_flight(&mut self, flight_id: i64) -> StoreResult<bool> {
        // seats and routes go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM flights WHERE flight_id = $1")
            .bind(flight_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_route(&mut self, route: &NewRoute) -> StoreResult<FlightRoute> {
        let row = sqlx::query_as::<_, RouteRow>(concat!(
            "INSERT INTO flight_routes (flight_id, departure_city, arrival_city, departure_time, ",
            "arrival_time, base_price, gst, total_price) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            route_columns!()
        ))
        .bind(route.flight_id)
        .bind(&route.departure_city)
        .bind(&route.arrival_city)
        .bind(route.departure_time)
        .bind(route.arrival_time)
        .bind(route.base_price)
        .bind(route.gst)
        .bind(route.total_price)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn get_route(&mut self, route_id: i64) -> StoreResult<Option<FlightRoute>> {
        let row = sqlx::query_as::<_, RouteRow>(concat!(
            "SELECT ", route_columns!(), " FROM flight_routes WHERE route_id = $1"
        ))
        .bind(route_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(FlightRoute::from))
    }

    async fn update_route(&mut self, route: &FlightRoute) -> StoreResult<Option<FlightRoute>> {
        let row = sqlx::query_as::<_, RouteRow>(concat!(
            "UPDATE flight_routes SET departure_city = $2, arrival_city = $3, departure_time = $4, ",
            "arrival_time = $5, base_price = $6, gst = $7, total_price = $8 ",
            "WHERE route_id = $1 RETURNING ",
            route_columns!()
        ))
        .bind(route.route_id)
        .bind(&route.departure_city)
        .bind(&route.arrival_city)
        .bind(route.departure_time)
        .bind(route.arrival_time)
        .bind(route.base_price)
        .bind(route.gst)
        .bind(route.total_price)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(FlightRoute::from))
    }

    async fn delete_route(&mut self, route_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM flight_routes WHERE route_id = $1")
            .bind(route_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_routes(&mut self, search: &RouteSearch, page: &PageRequest) -> StoreResult<Vec<FlightRoute>> {
        let (from, to) = day_bounds(search);
        let rows = sqlx::query_as::<_, RouteRow>(concat!(
            "SELECT ", route_columns!(), " FROM flight_routes ",
            "WHERE lower(departure_city) = lower($1) AND lower(arrival_city) = lower($2) ",
            "AND departure_time >= $3 AND departure_time < $4 ",
            "ORDER BY departure_time, route_id LIMIT $5 OFFSET $6"
        ))
        .bind(&search.departure_city)
        .bind(&search.arrival_city)
        .bind(from)
        .bind(to)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(FlightRoute::from).collect())
    }

    async fn count_routes(&mut self, search: &RouteSearch) -> StoreResult<i64> {
        let (from, to) = day_bounds(search);
        sqlx::query_scalar::<_, i64>(concat!(
            "SELECT COUNT(*) FROM flight_routes ",
            "WHERE lower(departure_city) = lower($1) AND lower(arrival_city) = lower($2) ",
            "AND departure_time >= $3 AND departure_time < $4"
        ))
        .bind(&search.departure_city)
        .bind(&search.arrival_city)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_seat_class(&mut self, class: &NewSeatClass) -> StoreResult<SeatClass> {
        let row = sqlx::query_as::<_, SeatClassRow>(
            "INSERT INTO seat_classes (class_name, price_multiplier) VALUES ($1, $2) \
             RETURNING class_id, class_name, price_multiplier",
        )
        .bind(&class.class_name)
        .bind(class.price_multiplier)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn get_seat_class(&mut self, class_id: i64) -> StoreResult<Option<SeatClass>> {
        let row = sqlx::query_as::<_, SeatClassRow>(
            "SELECT class_id, class_name, price_multiplier FROM seat_classes WHERE class_id = $1",
        )
        .bind(class_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(SeatClass::from))
    }

    async fn list_seat_classes(&mut self) -> StoreResult<Vec<SeatClass>> {
        let rows = sqlx::query_as::<_, SeatClassRow>(
            "SELECT class_id, class_name, price_multiplier FROM seat_classes ORDER BY class_id",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(SeatClass::from).collect())
    }

    async fn update_seat_class(&mut self, class_id: i64, patch: &SeatClassPatch) -> StoreResult<Option<SeatClass>> {
        let row = sqlx::query_as::<_, SeatClassRow>(
            "UPDATE seat_classes SET class_name = COALESCE($2, class_name), \
             price_multiplier = COALESCE($3, price_multiplier) \
             WHERE class_id = $1 RETURNING class_id, class_name, price_multiplier",
        )
        .bind(class_id)
        .bind(patch.class_name.as_deref())
        .bind(patch.price_multiplier)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(SeatClass::from))
    }

    async fn delete_seat_class(&mut self, class_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM seat_classes WHERE class_id = $1")
            .bind(class_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_seat(&mut self, seat: &NewSeat) -> StoreResult<Seat> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            "INSERT INTO seats (flight_id, seat_number, class_id) VALUES ($1, $2, $3) RETURNING ",
            seat_columns!()
        ))
        .bind(seat.flight_id)
        .bind(&seat.seat_number)
        .bind(seat.class_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn get_seat(&mut self, seat_id: i64) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            "SELECT ", seat_columns!(), " FROM seats WHERE seat_id = $1"
        ))
        .bind(seat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn lock_seat(&mut self, seat_id: i64) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            "SELECT ", seat_columns!(), " FROM seats WHERE seat_id = $1 FOR UPDATE"
        ))
        .bind(seat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn update_seat(&mut self, seat_id: i64, patch: &SeatPatch) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            "UPDATE seats SET seat_number = COALESCE($2, seat_number), class_id = COALESCE($3, class_id) ",
            "WHERE seat_id = $1 RETURNING ",
            seat_columns!()
        ))
        .bind(seat_id)
        .bind(patch.seat_number.as_deref())
        .bind(patch.class_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn delete_seat(&mut self, seat_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM seats WHERE seat_id = $1")
            .bind(seat_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_seats(&mut self, flight_id: i64) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM seats WHERE flight_id = $1")
            .bind(flight_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_booked_seats(&mut self, flight_id: i64) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM seats WHERE flight_id = $1 AND status = 'BOOKED'",
        )
        .bind(flight_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn available_seat_numbers(&mut self, flight_id: i64) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT seat_number FROM seats WHERE flight_id = $1 AND status = 'AVAILABLE' ORDER BY seat_number",
        )
        .bind(flight_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn lock_seats(&mut self, flight_id: i64, seat_numbers: &[String]) -> StoreResult<Vec<Seat>> {
        // Stable lock order keeps overlapping reservations from deadlocking
        let rows = sqlx::query_as::<_, SeatRow>(concat!(
            "SELECT ", seat_columns!(), " FROM seats ",
            "WHERE flight_id = $1 AND seat_number = ANY($2) ORDER BY seat_id FOR UPDATE"
        ))
        .bind(flight_id)
        .bind(seat_numbers)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn lock_booking_seats(&mut self, booking_id: i64) -> StoreResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(concat!(
            "SELECT ", seat_columns!(), " FROM seats WHERE booking_id = $1 ORDER BY seat_id FOR UPDATE"
        ))
        .bind(booking_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn book_seats(&mut self, seat_ids: &[i64], booking_id: i64) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE seats SET status = 'BOOKED', booking_id = $2 \
             WHERE seat_id = ANY($1) AND status = 'AVAILABLE'",
        )
        .bind(seat_ids)
        .bind(booking_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        debug!(booking_id, changed = result.rows_affected(), "Marked seats booked");
        Ok(result.rows_affected())
    }

    async fn free_seats(&mut self, seat_ids: &[i64]) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE seats SET status = 'AVAILABLE', booking_id = NULL \
             WHERE seat_id = ANY($1) AND status = 'BOOKED'",
        )
        .bind(seat_ids)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        debug!(changed = result.rows_affected(), "Freed seats");
        Ok(result.rows_affected())
    }

    async fn booking_seat_numbers(&mut self, booking_id: i64) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT seat_number FROM seats WHERE booking_id = $1 ORDER BY seat_number",
        )
        .bind(booking_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn stale_booked_seats(&mut self) -> StoreResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT s.seat_id, s.flight_id, s.seat_number, s.class_id, s.status, s.booking_id \
             FROM seats s JOIN bookings b ON b.booking_id = s.booking_id \
             WHERE s.status = 'BOOKED' AND b.booking_status = 'CANCELLED' \
             ORDER BY s.seat_id FOR UPDATE OF s",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(concat!(
            "INSERT INTO bookings (user_id, flight_id, total_price, booking_status) ",
            "VALUES ($1, $2, $3, $4) RETURNING ",
            booking_columns!()
        ))
        .bind(booking.user_id)
        .bind(booking.flight_id)
        .bind(booking.total_price)
        .bind(booking.booking_status.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn get_booking(&mut self, booking_id: i64) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(concat!(
            "SELECT ", booking_columns!(), " FROM bookings WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn lock_booking(&mut self, booking_id: i64) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(concat!(
            "SELECT ", booking_columns!(), " FROM bookings WHERE booking_id = $1 FOR UPDATE"
        ))
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn set_booking_status(&mut self, booking_id: i64, status: BookingStatus) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(concat!(
            "UPDATE bookings SET booking_status = $2, updated_at = NOW() WHERE booking_id = $1 RETURNING ",
            booking_columns!()
        ))
        .bind(booking_id)
        .bind(status.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn user_bookings(&mut self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(concat!(
            "SELECT ", booking_columns!(), " FROM bookings WHERE user_id = $1 ",
            "ORDER BY created_at DESC, booking_id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn count_flight_bookings(&mut self, flight_id: i64) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE flight_id = $1")
            .bind(flight_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn bookings_without_seats(&mut self) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT b.booking_id, b.user_id, b.flight_id, b.total_price, b.booking_status, \
             b.created_at, b.updated_at FROM bookings b \
             WHERE b.booking_status <> 'CANCELLED' \
             AND NOT EXISTS (SELECT 1 FROM seats s WHERE s.booking_id = b.booking_id) \
             ORDER BY b.booking_id",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn insert_passenger(&mut self, booking_id: i64, passenger: &NewPassenger) -> StoreResult<Passenger> {
        let row = sqlx::query_as::<_, PassengerRow>(concat!(
            "INSERT INTO passengers (booking_id, seat_number, passenger_name, age, gender, relation) ",
            "VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            passenger_columns!()
        ))
        .bind(booking_id)
        .bind(&passenger.seat_number)
        .bind(&passenger.passenger_name)
        .bind(passenger.age)
        .bind(passenger.gender.as_str())
        .bind(passenger.relation.as_deref())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn booking_passengers(&mut self, booking_id: i64) -> StoreResult<Vec<Passenger>> {
        let rows = sqlx::query_as::<_, PassengerRow>(concat!(
            "SELECT ", passenger_columns!(), " FROM passengers WHERE booking_id = $1 ORDER BY seat_number"
        ))
        .bind(booking_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn delete_passengers(&mut self, booking_id: i64, seat_numbers: Option<&[String]>) -> StoreResult<u64> {
        let result = match seat_numbers {
            Some(seats) => {
                sqlx::query("DELETE FROM passengers WHERE booking_id = $1 AND seat_number = ANY($2)")
                    .bind(booking_id)
                    .bind(seats)
                    .execute(&mut *self.tx)
                    .await
            }
            None => {
                sqlx::query("DELETE FROM passengers WHERE booking_id = $1")
                    .bind(booking_id)
                    .execute(&mut *self.tx)
                    .await
            }
        }
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> StoreResult<Payment> {
        let row = sqlx::query_as::<_, PaymentRow>(concat!(
            "INSERT INTO payments (booking_id, user_id, amount, payment_status, payment_date) ",
            "VALUES ($1, $2, $3, $4, $5) RETURNING ",
            payment_columns!()
        ))
        .bind(payment.booking_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(payment.payment_status.as_str())
        .bind(payment.payment_date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn get_payment(&mut self, payment_id: i64) -> StoreResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(concat!(
            "SELECT ", payment_columns!(), " FROM payments WHERE payment_id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn set_payment_status(&mut self, payment_id: i64, status: PaymentStatus) -> StoreResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(concat!(
            "UPDATE payments SET payment_status = $2 WHERE payment_id = $1 RETURNING ",
            payment_columns!()
        ))
        .bind(payment_id)
        .bind(status.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_opt(row)
    }

    async fn delete_payment(&mut self, payment_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn booking_payments(&mut self, booking_id: i64) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(concat!(
            "SELECT ", payment_columns!(), " FROM payments WHERE booking_id = $1 ",
            "ORDER BY payment_date, payment_id"
        ))
        .bind(booking_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        convert_all(rows)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_day_bounds_cover_one_utc_day() {
        let search = RouteSearch {
            departure_city: "Delhi".to_string(),
            arrival_city: "Mumbai".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        };
        let (from, to) = day_bounds(&search);
        assert_eq!(from.to_rfc3339(), "2025-03-14T00:00:00+00:00");
        assert_eq!(to - from, Duration::days(1));
    }

    #[test]
    fn test_unknown_status_is_backend_error() {
        let row = SeatRow {
            seat_id: 1,
            flight_id: 1,
            seat_number: "1A".to_string(),
            class_id: None,
            status: "HELD".to_string(),
            booking_id: None,
        };
        assert!(matches!(Seat::try_from(row), Err(StoreError::Backend(_))));
    }
}
