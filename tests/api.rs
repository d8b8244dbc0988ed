use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use ride_booking_backend::{
    config::Config,
    routes::create_router,
    store::{MemoryAccountStore, MemoryBookingStore},
    AppState,
};

fn app() -> Router {
    let config = Config {
        database_url: String::new(),
        jwt_secret: "integration-secret".to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        service_radius_km: 10.0,
    };
    let accounts = Arc::new(MemoryAccountStore::new());
    let bookings = Arc::new(MemoryBookingStore::new(accounts.clone()));
    let state = AppState::new(config, accounts, bookings);
    create_router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
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
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register_rider(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/accounts",
        None,
        Some(json!({
            "name": "Rita Rider",
            "email": email,
            "password": "secret123",
            "phone": "555-0101"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn register_driver(app: &Router, email: &str, location: Option<(f64, f64)>) -> String {
    let mut payload = json!({
        "name": "Dan Driver",
        "email": email,
        "password": "secret123",
        "phone": "555-0202",
        "role": "driver",
        "vehicleType": "sedan",
        "vehicleNumber": "ABC-123",
        "licenseNumber": "L-42"
    });
    if let Some((lat, lng)) = location {
        payload["location"] = json!({ "lat": lat, "lng": lng, "address": "Depot" });
    }

    let (status, body) = send(app, Method::POST, "/api/accounts", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_booking(app: &Router, token: &str, pickup: (f64, f64)) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/bookings",
        Some(token),
        Some(json!({
            "pickup": { "address": "1 Main St", "lat": pickup.0, "lng": pickup.1 },
            "destination": { "address": "9 Far Ave", "lat": 40.1, "lng": -73.1 },
            "fare": 15
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn login_reports_unknown_email_and_bad_password() {
    let app = app();
    register_rider(&app, "rita@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        None,
        Some(json!({ "email": "rita@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["role"], "rider");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email not found");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        None,
        Some(json!({ "email": "rita@example.com", "password": "nope-nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Incorrect password");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    register_rider(&app, "rita@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts",
        None,
        Some(json!({ "name": "Other", "email": "rita@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/api/accounts/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/bookings", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_profile() {
    let app = app();
    let token = register_driver(&app, "dan@example.com", Some((40.0, -73.0))).await;

    let (status, body) = send(&app, Method::GET, "/api/accounts/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["email"], "dan@example.com");
    assert_eq!(body["account"]["isAvailable"], true);
    assert_eq!(body["account"]["totalRides"], 0);
    assert_eq!(body["account"]["location"]["lat"], 40.0);
    assert!(body["account"].get("passwordHash").is_none());
}

#[tokio::test]
async fn availability_is_driver_only() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;
    let driver = register_driver(&app, "dan@example.com", None).await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/accounts/me/availability",
        Some(&rider),
        Some(json!({ "isAvailable": false })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/accounts/me/availability",
        Some(&driver),
        Some(json!({ "isAvailable": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAvailable"], false);
}

#[tokio::test]
async fn create_booking_round_trip() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;

    let created = create_booking(&app, &rider, (40.0, -73.0)).await;
    assert_eq!(created["status"], "pending");
    assert!(created["driverId"].is_null());
    assert_eq!(created["rider"]["name"], "Rita Rider");

    let (status, listed) = send(&app, Method::GET, "/api/bookings?scope=mine", Some(&rider), None).await;
    assert_eq!(status, StatusCode::OK);
    let first = &listed.as_array().unwrap()[0];
    assert_eq!(first["id"], created["id"]);
    assert_eq!(first["pickup"]["lat"], 40.0);
    assert_eq!(first["pickup"]["lng"], -73.0);
    assert_eq!(first["destination"]["lat"], 40.1);
    assert_eq!(first["destination"]["lng"], -73.1);
    assert_eq!(first["fare"], 15.0);
}

#[tokio::test]
async fn create_booking_validates_input() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&rider),
        Some(json!({
            "pickup": { "address": "1 Main St", "lat": 40.0, "lng": -73.0 },
            "fare": 15
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&rider),
        Some(json!({
            "pickup": { "address": "1 Main St", "lat": 40.0, "lng": -73.0 },
            "destination": { "address": "9 Far Ave", "lat": 40.1, "lng": -73.1 },
            "fare": -5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_requests_get_structured_errors() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;

    // Pickup without an address key
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&rider),
        Some(json!({
            "pickup": { "lat": 40.0, "lng": -73.0 },
            "destination": { "address": "9 Far Ave", "lat": 40.1, "lng": -73.1 },
            "fare": 15
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert!(body["message"].as_str().unwrap().contains("address"));

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/bookings/not-a-uuid/accept",
        Some(&rider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/bookings?scope=everything",
        Some(&rider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        None,
        Some(json!({ "email": "rita@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn overlong_input_is_a_validation_error() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&rider),
        Some(json!({
            "pickup": { "address": "a".repeat(300), "lat": 40.0, "lng": -73.0 },
            "destination": { "address": "9 Far Ave", "lat": 40.1, "lng": -73.1 },
            "fare": 15
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts",
        None,
        Some(json!({
            "name": "n".repeat(101),
            "email": "long@example.com",
            "password": "secret123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn available_scope_filters_by_radius() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;
    let driver = register_driver(&app, "dan@example.com", Some((40.0, -73.0))).await;

    let near = create_booking(&app, &rider, (40.085, -73.0)).await;
    create_booking(&app, &rider, (40.20, -73.0)).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/bookings?scope=available",
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&Value> = body.as_array().unwrap().iter().map(|b| &b["id"]).collect();
    assert_eq!(ids, vec![&near["id"]]);
}

#[tokio::test]
async fn available_scope_without_location_is_bad_request() {
    let app = app();
    let driver = register_driver(&app, "dan@example.com", None).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/bookings?scope=available",
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "configuration");
    assert_eq!(body["message"], "Driver location not set");

    // Setting a location fixes it
    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/accounts/me/location",
        Some(&driver),
        Some(json!({ "lat": 40.0, "lng": -73.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/bookings?scope=available",
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ride_lifecycle_over_http() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;
    let driver = register_driver(&app, "dan@example.com", Some((40.0, -73.0))).await;
    let booking = create_booking(&app, &rider, (40.01, -73.0)).await;
    let id = booking["id"].as_str().unwrap();

    let (status, accepted) = send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{id}/accept"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["driver"]["name"], "Dan Driver");

    // A second accept loses
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{id}/accept"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "not_available");

    let (_, active) = send(
        &app,
        Method::GET,
        "/api/bookings?scope=driver-active",
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    // Riders cannot start the ride
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{id}/status"),
        Some(&rider),
        Some(json!({ "status": "in-progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for next in ["in-progress", "completed"] {
        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/bookings/{id}/status"),
            Some(&driver),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], next);
    }

    let (_, me) = send(&app, Method::GET, "/api/accounts/me", Some(&driver), None).await;
    assert_eq!(me["account"]["totalRides"], 1);
    assert_eq!(me["account"]["isAvailable"], true);

    let (_, active) = send(
        &app,
        Method::GET,
        "/api/bookings?scope=driver-active",
        Some(&driver),
        None,
    )
    .await;
    assert!(active.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rider_cancel_frees_driver() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;
    let driver = register_driver(&app, "dan@example.com", Some((40.0, -73.0))).await;
    let booking = create_booking(&app, &rider, (40.01, -73.0)).await;
    let id = booking["id"].as_str().unwrap();

    send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{id}/accept"),
        Some(&driver),
        None,
    )
    .await;
    let (_, me) = send(&app, Method::GET, "/api/accounts/me", Some(&driver), None).await;
    assert_eq!(me["account"]["isAvailable"], false);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{id}/status"),
        Some(&rider),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (_, me) = send(&app, Method::GET, "/api/accounts/me", Some(&driver), None).await;
    assert_eq!(me["account"]["isAvailable"], true);
}

#[tokio::test]
async fn status_errors_map_to_http_codes() {
    let app = app();
    let rider = register_rider(&app, "rita@example.com").await;
    let other_rider = register_rider(&app, "rob@example.com").await;
    let booking = create_booking(&app, &rider, (40.01, -73.0)).await;
    let id = booking["id"].as_str().unwrap();

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{missing}/status"),
        Some(&rider),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{id}/status"),
        Some(&other_rider),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/bookings/{id}/status"),
        Some(&rider),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}
