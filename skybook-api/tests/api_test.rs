use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use skybook_api::middleware::auth::issue_token;
use skybook_api::{app, AppState, AuthConfig};
use skybook_core::{Gender, User, UserRole};
use skybook_store::MemoryStore;

const ADMIN_EMAIL: &str = "ops@skybook.test";

fn test_app() -> (Router, AuthConfig) {
    let auth = AuthConfig::new("integration-secret", 3600, &[ADMIN_EMAIL.to_string()]);
    let state = AppState::new(Arc::new(MemoryStore::new()), auth.clone(), Duration::from_secs(5));
    (app(state), auth)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

/// Registers and logs in, returning `(user_id, token)`.
async fn sign_up(app: &Router, name: &str, email: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": name,
            "age": 30,
            "gender": "Female",
            "email": email,
            "password": "Secret123",
            "phone": "9876543210"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "Secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    (
        body["data"]["user_id"].as_i64().unwrap(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

/// Admin sets up flight `SB101` with seats 1A, 1B, 1C and one route. Returns the flight id.
async fn seed_flight(app: &Router, admin: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/flight",
        Some(admin),
        Some(json!({ "airline": "Skybook Air", "flight_number": "SB101", "total_seats": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let flight_id = body["data"]["flight_id"].as_i64().unwrap();

    for seat in ["1A", "1B", "1C"] {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/seats/add",
            Some(admin),
            Some(json!({ "flight_id": flight_id, "seat_number": seat })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let (status, body) = send(
        app,
        Method::POST,
        "/api/flight/routes",
        Some(admin),
        Some(json!({
            "flight_id": flight_id,
            "departure_city": "Delhi",
            "arrival_city": "Mumbai",
            "departure_time": "2030-05-01T06:00:00Z",
            "arrival_time": "2030-05-01T08:10:00Z",
            "base_price": "100.00",
            "gst": "18.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    flight_id
}

async fn book(app: &Router, token: &str, flight_id: i64, seats: &[&str]) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/bookings",
        Some(token),
        Some(json!({ "flight_id": flight_id, "seat_numbers": seats, "total_price": "200.00" })),
    )
    .await
}

#[tokio::test]
async fn test_health_uses_envelope() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);
    assert_eq!(body["message"], "OK");
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let (app, _) = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "A",
            "age": 30,
            "gender": "Male",
            "email": "not-an-email",
            "password": "weakpass",
            "phone": "12345"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    let fields: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"phone"));

    let (user_id, _) = sign_up(&app, "Meera", "meera@example.com").await;
    assert!(user_id > 0);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Meera Two",
            "age": 31,
            "gender": "Female",
            "email": "MEERA@example.com",
            "password": "Secret123",
            "phone": "9876543210"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials_alike() {
    let (app, _) = test_app();
    sign_up(&app, "Kiran", "kiran@example.com").await;

    let (wrong_password, body_a) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "kiran@example.com", "password": "Wrong123" })),
    )
    .await;
    let (unknown_email, body_b) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "Secret123" })),
    )
    .await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a["message"], body_b["message"]);
}

#[tokio::test]
async fn test_profile_access_rules() {
    let (app, _) = test_app();
    let (admin_id, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (alice_id, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let (bob_id, _) = sign_up(&app, "Bob", "bob@example.com").await;

    let (status, body) = send(&app, Method::GET, &format!("/api/auth/profile/{}", alice_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("password_hash").is_none());
    assert_eq!(body["data"]["user_role"], "CUSTOMER");

    let (status, _) = send(&app, Method::GET, &format!("/api/auth/profile/{}", bob_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, &format!("/api/auth/profile/{}", bob_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "bob@example.com");

    let (status, _) = send(&app, Method::GET, "/api/auth/allUser", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/auth/allUser?page=1&per_page=2", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert!(admin_id > 0);
}

#[tokio::test]
async fn test_profile_update_rehashes_password() {
    let (app, _) = test_app();
    sign_up(&app, "Dev", "dev@example.com").await;
    let (_, token) = sign_up(&app, "Neha", "neha@example.com").await;

    let (status, _) = send(&app, Method::PUT, "/api/auth/update", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/auth/update",
        Some(&token),
        Some(json!({ "email": "dev@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/auth/update",
        Some(&token),
        Some(json!({ "name": "Neha K", "password": "Changed9x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["name"], "Neha K");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "neha@example.com", "password": "Changed9x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_and_stale_admin_claim() {
    let (app, auth) = test_app();
    let (user_id, _) = sign_up(&app, "Ravi", "ravi@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/flight",
        None,
        Some(json!({ "airline": "X", "flight_number": "X1", "total_seats": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);

    // A token claiming ADMIN does not grant admin rights the account lacks.
    let forged = issue_token(
        &auth,
        &User {
            user_id,
            name: "Ravi".to_string(),
            age: 30,
            gender: Gender::Male,
            email: "ravi@example.com".to_string(),
            password_hash: String::new(),
            phone: "9876543210".to_string(),
            user_role: UserRole::Admin,
            created_at: Utc::now(),
        },
    )
    .unwrap();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/flight",
        Some(&forged),
        Some(json!({ "airline": "X", "flight_number": "X1", "total_seats": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/seats/classes", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_browse_and_search() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let flight_id = seed_flight(&app, &admin).await;

    let (status, body) = send(&app, Method::GET, "/api/flight", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = send(&app, Method::GET, &format!("/api/flight/{}", flight_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["flight_number"], "SB101");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/flight/search?departure_city=delhi&arrival_city=MUMBAI&date=2030-05-01",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["total_price"], "118.00");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/flight/search?departure_city=Delhi&arrival_city=Mumbai&date=2030-05-02",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, "/api/flight/search?departure_city=Delhi", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, &format!("/api/flight/{}/seats", flight_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available_seats"], json!(["1A", "1B", "1C"]));

    let (status, _) = send(&app, Method::GET, "/api/flight/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_conflict_reports_seats() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let (_, bob) = sign_up(&app, "Bob", "bob@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;

    let (status, body) = book(&app, &alice, flight_id, &["1A", "1B"]).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["booking_status"], "CONFIRMED");
    assert_eq!(body["data"]["seats"], json!(["1A", "1B"]));

    let (status, body) = book(&app, &bob, flight_id, &["1B", "1C"]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["conflicting_seats"], json!(["1B"]));

    let (status, body) = send(&app, Method::GET, &format!("/api/seats/available/{}", flight_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available_seats"], json!(["1C"]));
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (alice_id, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let (_, bob) = sign_up(&app, "Bob", "bob@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;

    let (_, body) = book(&app, &alice, flight_id, &["1A", "1B"]).await;
    let booking_id = body["data"]["booking_id"].as_i64().unwrap();

    let (status, _) = send(&app, Method::GET, &format!("/api/bookings/{}", booking_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/bookings/cancel-seats",
        Some(&bob),
        Some(json!({ "booking_id": booking_id, "seat_numbers": ["1A"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/bookings/cancel-seats",
        Some(&alice),
        Some(json!({ "booking_id": booking_id, "seat_numbers": ["1a"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["released_seats"], json!(["1A"]));
    assert_eq!(body["data"]["remaining_seats"], json!(["1B"]));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/bookings/modify",
        Some(&alice),
        Some(json!({
            "booking_id": booking_id,
            "seat_numbers": ["1C"],
            "passengers": [{ "seat_number": "1C", "passenger_name": "Asha", "age": 7, "gender": "Female", "relation": "Daughter" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["seats"], json!(["1C"]));
    assert_eq!(body["data"]["passengers"][0]["passenger_name"], "Asha");

    let (status, body) = send(&app, Method::GET, &format!("/api/bookings/user/{}", alice_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::PUT, &format!("/api/bookings/cancel/{}", booking_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["booking"]["booking_status"], "CANCELLED");
    assert_eq!(body["data"]["released_seats"], json!(["1C"]));

    let (status, _) = send(&app, Method::PUT, &format!("/api/bookings/cancel/{}", booking_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, Method::GET, &format!("/api/flight/{}/seats", flight_id), None, None).await;
    assert_eq!(body["data"]["available_seats"], json!(["1A", "1B", "1C"]));
}

#[tokio::test]
async fn test_passenger_validation_is_reported_per_field() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&alice),
        Some(json!({
            "flight_id": flight_id,
            "seat_numbers": ["1A"],
            "total_price": "100.00",
            "passengers": [{ "seat_number": "1A", "passenger_name": "X", "age": 0, "gender": "Other" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["passengers[0].age", "passengers[0].passenger_name"]);

    let (_, body) = send(&app, Method::GET, &format!("/api/flight/{}/seats", flight_id), None, None).await;
    assert_eq!(body["data"]["available_seats"], json!(["1A", "1B", "1C"]));
}

#[tokio::test]
async fn test_seat_endpoints_reserve_and_release() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;

    let (_, body) = book(&app, &alice, flight_id, &["1A"]).await;
    let booking_id = body["data"]["booking_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/seats/book",
        Some(&alice),
        Some(json!({ "flight_id": flight_id, "booking_id": booking_id, "seat_numbers": ["1B", "1C"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["seats"], json!(["1B", "1C"]));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/seats/cancel",
        Some(&alice),
        Some(json!({ "booking_id": booking_id, "seat_numbers": ["1C", "1C"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["seats"], json!(["1C"]));
    assert_eq!(body["data"]["booking_cancelled"], false);

    // Releasing again is a no-op.
    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/seats/cancel",
        Some(&alice),
        Some(json!({ "booking_id": booking_id, "seat_numbers": ["1C"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["seats"], json!([]));
}

#[tokio::test]
async fn test_seat_and_class_administration() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/seats/classes",
        Some(&admin),
        Some(json!({ "class_name": "Business", "price_multiplier": "1.75" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let class_id = body["data"]["class_id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/seats/classes",
        Some(&alice),
        Some(json!({ "class_name": "Economy", "price_multiplier": "1.0" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/seats/classes", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Seat cap is total_seats (3), already reached.
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/seats/add",
        Some(&admin),
        Some(json!({ "flight_id": flight_id, "seat_number": "2A", "class_id": class_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = book(&app, &alice, flight_id, &["1A"]).await;
    assert_eq!(body["data"]["seats"], json!(["1A"]));

    let (_, body) = send(&app, Method::GET, &format!("/api/flight/{}/seats", flight_id), None, None).await;
    assert_eq!(body["data"]["available_seats"], json!(["1B", "1C"]));
}

#[tokio::test]
async fn test_payments_follow_booking_ownership() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let (_, bob) = sign_up(&app, "Bob", "bob@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;

    let (_, body) = book(&app, &alice, flight_id, &["1A"]).await;
    let booking_id = body["data"]["booking_id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/payments",
        Some(&bob),
        Some(json!({ "booking_id": booking_id, "amount": "118.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/payments",
        Some(&alice),
        Some(json!({ "booking_id": booking_id, "amount": "118.00", "payment_status": "FAILED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let payment_id = body["data"]["payment_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/payments/{}", payment_id),
        Some(&alice),
        Some(json!({ "payment_status": "SUCCESS" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "SUCCESS");

    let (status, body) = send(&app, Method::GET, &format!("/api/payments/booking/{}", booking_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Payment state never touches the booking.
    let (_, body) = send(&app, Method::GET, &format!("/api/bookings/{}", booking_id), Some(&alice), None).await;
    assert_eq!(body["data"]["booking_status"], "CONFIRMED");

    let (status, _) = send(&app, Method::GET, &format!("/api/payments/{}", payment_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/payments/{}", payment_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &format!("/api/payments/{}", payment_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reconcile_endpoint_is_admin_only() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;

    let (status, _) = send(&app, Method::POST, "/api/admin/reconcile", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, "/api/admin/reconcile", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cancelled_bookings"], json!([]));
    assert_eq!(body["data"]["released_seats"], 0);
}

#[tokio::test]
async fn test_sold_flight_is_protected() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;
    let (status, _) = book(&app, &alice, flight_id, &["1A"]).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/flight/{}", flight_id),
        Some(&admin),
        Some(json!({ "flight_number": "SB999" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/flight/{}", flight_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, &format!("/api/flight/{}", flight_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["flight_number"], "SB101");
}

#[tokio::test]
async fn test_sub_cent_amounts_are_rejected() {
    let (app, _) = test_app();
    let (_, admin) = sign_up(&app, "Ops", ADMIN_EMAIL).await;
    let (_, alice) = sign_up(&app, "Alice", "alice@example.com").await;
    let flight_id = seed_flight(&app, &admin).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&alice),
        Some(json!({ "flight_id": flight_id, "seat_numbers": ["1A"], "total_price": "99.999" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
