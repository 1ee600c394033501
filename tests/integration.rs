use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use vantage_ride::api::rest::router;
use vantage_ride::backend::{DynBackend, MemoryBackend};
use vantage_ride::config::Config;
use vantage_ride::state::AppContext;

struct TestApp {
    app: Router,
    memory: Arc<MemoryBackend>,
    _dir: TempDir,
}

fn setup() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let memory = Arc::new(MemoryBackend::default());
    let backend: DynBackend = memory.clone();
    let ctx = AppContext::with_backend(Config::in_memory(dir.path().to_path_buf()), backend).unwrap();
    TestApp {
        app: router(Arc::new(ctx)),
        memory,
        _dir: dir,
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn customer() -> Value {
    json!({
        "fullName": "Asha Kulkarni",
        "username": "asha_k",
        "email": "asha@example.com",
        "phoneNumber": "9876543210",
        "password": "secret12",
        "role": "customer"
    })
}

fn driver() -> Value {
    json!({
        "fullName": "Ravi Patil",
        "username": "ravi_pilot",
        "email": "ravi@example.com",
        "phoneNumber": "9123456780",
        "password": "secret12",
        "role": "driver",
        "licenseNumber": "MH1220240001",
        "vehicleModel": "Swift Dzire",
        "vehiclePlate": "MH12AB1234"
    })
}

async fn login(app: &Router, email: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/auth/login",
            json!({ "email": email, "password": "secret12" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn trip() -> Value {
    json!({
        "sourceDistrict": "Pune",
        "sourceCity": "Kothrud",
        "destinationDistrict": "Raigad",
        "destinationCity": "Alibag",
        "date": "2026-11-02",
        "time": "06:30"
    })
}

#[tokio::test]
async fn health_reports_connectivity_and_session() {
    let t = setup();
    let (status, body) = send(&t.app, empty_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["online"], true);
    assert_eq!(body["signed_in"], false);
    assert_eq!(body["active_listeners"], 0);
}

#[tokio::test]
async fn metrics_endpoint_exposes_fetch_counters() {
    let t = setup();
    send(&t.app, empty_request("GET", "/routes")).await;

    let response = t
        .app
        .clone()
        .oneshot(empty_request("GET", "/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("fetch_total"));
    assert!(text.contains("active_listeners"));
}

#[tokio::test]
async fn fare_quote_and_enquiry_link() {
    let t = setup();

    let (status, body) = send(&t.app, empty_request("GET", "/fares/quote?destination=Lonavala")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["price"], "₹3599/-");

    let (_, body) = send(&t.app, empty_request("GET", "/fares/quote?destination=Nagpur")).await;
    assert_eq!(body["valid"], false);

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/enquiries",
            json!({
                "name": "Asha",
                "phone": "9876543210",
                "source": "Pune",
                "destination": "Lonavala",
                "car": ""
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enquiry"]["car"], "Swift Dzire");
    assert!(body["whatsapp_link"].as_str().unwrap().starts_with("https://wa.me/"));

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/enquiries",
            json!({ "name": "", "phone": "", "source": "", "destination": "Goa", "car": "" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Please share your name, phone and trip details.");
}

#[tokio::test]
async fn signup_validation_and_login_errors() {
    let t = setup();

    let mut bad = customer();
    bad["phoneNumber"] = json!("12345");
    let (status, body) = send(&t.app, json_request("POST", "/auth/signup", bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["phoneNumber"].is_array());

    let (status, body) = send(&t.app, json_request("POST", "/auth/signup", customer())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["redirect"], "/login");

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/auth/login",
            json!({ "email": "asha@example.com", "password": "wrong123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let session = login(&t.app, "asha@example.com").await;
    assert_eq!(session["role"], "customer");

    let (_, body) = send(&t.app, empty_request("GET", "/auth/session")).await;
    assert_eq!(body["guest_redirect"], "/");
    assert_eq!(body["session"]["email"], "asha@example.com");

    send(&t.app, empty_request("POST", "/auth/logout")).await;
    let (_, body) = send(&t.app, empty_request("GET", "/auth/session")).await;
    assert!(body["session"].is_null());
}

#[tokio::test]
async fn booking_is_accepted_once_over_http() {
    let t = setup();
    send(&t.app, json_request("POST", "/auth/signup", driver())).await;
    send(&t.app, json_request("POST", "/auth/signup", customer())).await;
    let driver_id = t
        .memory
        .rows("profiles")
        .into_iter()
        .find(|row| row["username"] == "ravi_pilot")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = send(
        &t.app,
        json_request("POST", &format!("/bookings?driver_id={driver_id}"), trip()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    login(&t.app, "asha@example.com").await;
    let (status, booking) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/bookings?car=Swift%20Dzire&driver_id={driver_id}"),
            trip(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["car_name"], "Swift Dzire");
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, _) = send(&t.app, empty_request("GET", "/notifications/driver")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    send(&t.app, empty_request("POST", "/auth/logout")).await;
    login(&t.app, "ravi@example.com").await;

    let (status, body) = send(&t.app, empty_request("GET", "/notifications/driver")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["user_name"], "Asha Kulkarni");

    let accept = format!("/notifications/driver/{booking_id}/accept");
    let (status, body) = send(&t.app, empty_request("POST", &accept)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "accepted");
    assert_eq!(body["remaining"], 0);

    let (status, _) = send(&t.app, empty_request("POST", &accept)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&t.app, empty_request("GET", "/rides")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_driver"], true);
    assert_eq!(body["rides"][0]["status"], "accepted");
}

#[tokio::test]
async fn offline_device_rejects_booking() {
    let t = setup();
    send(&t.app, json_request("POST", "/auth/signup", customer())).await;
    login(&t.app, "asha@example.com").await;

    let (status, body) = send(&t.app, json_request("PUT", "/network", json!({ "online": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], false);

    let uri = format!("/bookings?driver_id={}", uuid::Uuid::new_v4());
    let (status, _) = send(&t.app, json_request("POST", &uri, trip())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(t.memory.rows("bookings").is_empty());

    let (status, body) = send(&t.app, empty_request("GET", "/routes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["error"],
        "Network disconnected. Please check your internet connection."
    );
}

#[tokio::test]
async fn incomplete_booking_form_is_unprocessable() {
    let t = setup();
    send(&t.app, json_request("POST", "/auth/signup", customer())).await;
    login(&t.app, "asha@example.com").await;

    let mut partial = trip();
    partial["sourceCity"] = json!("");
    let uri = format!("/bookings?driver_id={}", uuid::Uuid::new_v4());
    let (status, body) = send(&t.app, json_request("POST", &uri, partial)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Please fill out all fields completely.");
}

#[tokio::test]
async fn theme_toggles_and_startup_finishes() {
    let t = setup();

    let (_, before) = send(&t.app, empty_request("GET", "/theme")).await;
    let (_, after) = send(&t.app, empty_request("POST", "/theme")).await;
    assert_ne!(before["theme"], after["theme"]);

    let (_, view) = send(&t.app, empty_request("GET", "/startup")).await;
    assert_eq!(view["show_loader"], true);
    send(&t.app, empty_request("POST", "/startup")).await;
    let (_, view) = send(&t.app, empty_request("GET", "/startup")).await;
    assert_eq!(view["show_loader"], false);
}

#[tokio::test]
async fn avatar_upload_requires_an_image() {
    let t = setup();
    send(&t.app, json_request("POST", "/auth/signup", customer())).await;
    login(&t.app, "asha@example.com").await;

    let (status, body) = send(&t.app, empty_request("POST", "/profile/avatar")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image selected.");

    let (status, body) = send(&t.app, empty_request("GET", "/profile")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Asha Kulkarni");
}
