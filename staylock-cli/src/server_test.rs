use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use staylock_core::client::BookingClient;
use staylock_core::config::ArbiterConfig;

use crate::server::{create_client, router, AppState};

fn app() -> Router {
    let client = BookingClient::new(ArbiterConfig::new(5).unwrap());
    router(AppState::new(client), 16)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, id: u64) {
    let (status, _) = call(
        app,
        "POST",
        "/properties",
        Some(json!({ "property_id": id, "name": "amazing_house" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn stay(token: Option<&str>) -> Value {
    json!({
        "check_in_date": "2018-06-06",
        "check_out_date": "2018-06-10",
        "lock_token": token,
    })
}

fn booking(token: &str) -> Value {
    json!({
        "check_in_date": "2018-06-06",
        "check_out_date": "2018-06-10",
        "lock_token": token,
        "firstname": "Bob",
        "lastname": "Smith",
        "email": "bob@example.com",
    })
}

#[tokio::test]
async fn health_reports_lease() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lease_minutes"], 5);
}

#[tokio::test]
async fn unknown_property_is_not_found() {
    let app = app();
    let (status, body) = call(&app, "POST", "/properties/42/availability", Some(stay(None))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn probe_generates_token_and_blocks_others() {
    let app = app();
    register(&app, 1).await;

    let (status, body) = call(&app, "POST", "/properties/1/availability", Some(stay(None))).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["lock_token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["check_in_date"], "2018-06-06");

    // Same session probes again with its token
    let (status, body) = call(&app, "POST", "/properties/1/availability", Some(stay(Some(&token)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lock_token"], token.as_str());

    let (status, body) = call(&app, "POST", "/properties/1/availability", Some(stay(Some("someone_else")))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "BEING_LOCKED");
    assert_eq!(
        body["error"],
        "This property is being booked by somebody else. Please wait 5 minutes and try again"
    );
    assert_eq!(body["retry_after_minutes"], 5);
}

#[tokio::test]
async fn booking_flow_and_late_confirm() {
    let app = app();
    register(&app, 1).await;

    let (_, body) = call(&app, "POST", "/properties/1/availability", Some(stay(Some("lock_token")))).await;
    assert_eq!(body["success"], true);

    let (status, body) = call(&app, "POST", "/properties/1/reservations", Some(booking("lock_token"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Property successfully booked");
    assert_eq!(body["data"]["guest"]["first_name"], "Bob");
    assert_eq!(body["data"]["property_id"], 1);

    let (status, body) = call(&app, "POST", "/properties/1/availability", Some(stay(Some("late")))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "ALREADY_RESERVED");
    assert_eq!(body["error"], "This property is already booked at this period of time");
    assert_eq!(body["retry_after_minutes"], Value::Null);

    let (status, body) = call(&app, "POST", "/properties/1/reservations", Some(booking("late"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "This property was booked by somebody else in the meantime");

    let (_, body) = call(&app, "GET", "/properties/1/reservations", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = call(&app, "GET", "/properties/1/locks", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_dates_are_bad_requests() {
    let app = app();
    register(&app, 1).await;

    let req = json!({ "check_in_date": "2018-06-10", "check_out_date": "2018-06-06" });
    let (status, body) = call(&app, "POST", "/properties/1/availability", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let mut bad = booking("lock_token");
    bad["email"] = json!("not-an-email");
    let (status, _) = call(&app, "POST", "/properties/1/reservations", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn release_and_evict() {
    let app = app();
    register(&app, 1).await;
    call(&app, "POST", "/properties/1/availability", Some(stay(Some("mine")))).await;

    let (status, _) = call(&app, "DELETE", "/properties/1/locks/mine", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "DELETE", "/properties/1/locks/mine", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "POST", "/evict", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["evicted"], 0);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn largest_property_id_books_on_sqlite() {
    let client = create_client("sqlite::memory:", ArbiterConfig::new(5).unwrap()).unwrap();
    let app = router(AppState::new(client), 16);
    register(&app, u64::MAX).await;

    let uri = format!("/properties/{}/availability", u64::MAX);
    let (status, _) = call(&app, "POST", &uri, Some(stay(Some("mine")))).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/properties/{}/reservations", u64::MAX);
    let (status, body) = call(&app, "POST", &uri, Some(booking("mine"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["property_id"], u64::MAX);

    let (status, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[test]
fn storage_selection() {
    assert!(create_client("memory", ArbiterConfig::default()).is_ok());
    assert!(create_client("redis://localhost", ArbiterConfig::default()).is_err());
}
