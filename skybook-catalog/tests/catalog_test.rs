use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use skybook_catalog::{FlightCatalog, RouteCatalog, RouteInput, RoutePatch};
use skybook_core::{CoreError, FlightPatch, NewFlight, NewSeat, PageRequest, RouteSearch, Store};
use skybook_store::MemoryStore;

const TIMEOUT: Duration = Duration::from_secs(2);

fn catalogs() -> (Arc<MemoryStore>, FlightCatalog, RouteCatalog) {
    let store = Arc::new(MemoryStore::new());
    let flights = FlightCatalog::new(store.clone(), TIMEOUT);
    let routes = RouteCatalog::new(store.clone(), TIMEOUT);
    (store, flights, routes)
}

fn new_flight(number: &str, seats: i32) -> NewFlight {
    NewFlight {
        airline: "Vistara".to_string(),
        flight_number: number.to_string(),
        total_seats: seats,
    }
}

fn delhi_to_mumbai(flight_id: i64) -> RouteInput {
    RouteInput {
        flight_id,
        departure_city: "Delhi".to_string(),
        arrival_city: "Mumbai".to_string(),
        departure_time: Utc.with_ymd_and_hms(2025, 7, 4, 9, 30, 0).unwrap(),
        arrival_time: Utc.with_ymd_and_hms(2025, 7, 4, 11, 45, 0).unwrap(),
        base_price: Decimal::from(100),
        gst: Decimal::from(18),
    }
}

#[tokio::test]
async fn test_route_total_tracks_fare_components() {
    let (_, flights, routes) = catalogs();
    let flight = flights.add_flight(new_flight("UK-955", 120)).await.unwrap();

    let route = routes.add_route(delhi_to_mumbai(flight.flight_id)).await.unwrap();
    assert_eq!(route.total_price, Decimal::from(118));

    let patch = RoutePatch { gst: Some(Decimal::from(10)), ..Default::default() };
    let updated = routes.update_route(route.route_id, patch).await.unwrap();
    assert_eq!(updated.base_price, Decimal::from(100));
    assert_eq!(updated.total_price, Decimal::from(110));
}

#[tokio::test]
async fn test_route_prices_limited_to_cents() {
    let (_, flights, routes) = catalogs();
    let flight = flights.add_flight(new_flight("UK-955", 120)).await.unwrap();

    let mut input = delhi_to_mumbai(flight.flight_id);
    input.base_price = Decimal::new(100005, 3);
    input.gst = Decimal::new(18005, 3);
    let err = routes.add_route(input).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(_)));

    let route = routes.add_route(delhi_to_mumbai(flight.flight_id)).await.unwrap();
    let patch = RoutePatch { base_price: Some(Decimal::new(99999, 3)), ..Default::default() };
    let err = routes.update_route(route.route_id, patch).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(_)));
    assert_eq!(routes.get_route(route.route_id).await.unwrap().total_price, Decimal::from(118));
}

#[tokio::test]
async fn test_route_requires_existing_flight() {
    let (_, _, routes) = catalogs();
    let err = routes.add_route(delhi_to_mumbai(42)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_search_matches_cities_case_insensitively_on_date() {
    let (_, flights, routes) = catalogs();
    let flight = flights.add_flight(new_flight("UK-955", 120)).await.unwrap();
    routes.add_route(delhi_to_mumbai(flight.flight_id)).await.unwrap();

    let mut next_day = delhi_to_mumbai(flight.flight_id);
    next_day.departure_time = Utc.with_ymd_and_hms(2025, 7, 5, 9, 30, 0).unwrap();
    next_day.arrival_time = Utc.with_ymd_and_hms(2025, 7, 5, 11, 45, 0).unwrap();
    routes.add_route(next_day).await.unwrap();

    let search = RouteSearch {
        departure_city: "delhi".to_string(),
        arrival_city: "MUMBAI".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(),
    };
    let page = routes.search_routes(search, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].departure_time.date_naive(), NaiveDate::from_ymd_opt(2025, 7, 4).unwrap());
}

#[tokio::test]
async fn test_duplicate_flight_number_conflicts() {
    let (_, flights, _) = catalogs();
    flights.add_flight(new_flight("UK-955", 120)).await.unwrap();
    let err = flights.add_flight(new_flight("UK-955", 60)).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn test_total_seats_cannot_shrink_below_created_seats() {
    let (store, flights, _) = catalogs();
    let flight = flights.add_flight(new_flight("UK-955", 3)).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    for number in ["1A", "1B"] {
        tx.insert_seat(&NewSeat {
            flight_id: flight.flight_id,
            seat_number: number.to_string(),
            class_id: None,
        })
        .await
        .unwrap();
    }
    tx.commit().await.unwrap();

    let shrink = FlightPatch { total_seats: Some(1), ..Default::default() };
    let err = flights.update_flight(flight.flight_id, shrink).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let ok = FlightPatch { total_seats: Some(2), ..Default::default() };
    assert_eq!(flights.update_flight(flight.flight_id, ok).await.unwrap().total_seats, 2);
}

#[tokio::test]
async fn test_delete_flight_cascades_routes() {
    let (_, flights, routes) = catalogs();
    let flight = flights.add_flight(new_flight("UK-955", 120)).await.unwrap();
    let route = routes.add_route(delhi_to_mumbai(flight.flight_id)).await.unwrap();

    flights.delete_flight(flight.flight_id).await.unwrap();

    assert!(matches!(routes.get_route(route.route_id).await, Err(CoreError::NotFound(_))));
    assert!(matches!(flights.get_flight(flight.flight_id).await, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_list_flights_paginates() {
    let (_, flights, _) = catalogs();
    for n in 0..3 {
        flights.add_flight(new_flight(&format!("UK-10{}", n), 10)).await.unwrap();
    }
    let page = flights.list_flights(PageRequest::new(Some(2), Some(2))).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
}
