use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use vantage_ride::backend::{AuthApi, DynBackend, Filter, MemoryBackend, TableApi, UploadFile};
use vantage_ride::cache::{HISTORY_KEY, LoadOutcome, user_key};
use vantage_ride::config::Config;
use vantage_ride::error::AppError;
use vantage_ride::forms::booking::BookingInput;
use vantage_ride::forms::login::LoginInput;
use vantage_ride::forms::route::RouteInput;
use vantage_ride::forms::signup::SignupInput;
use vantage_ride::forms::vehicle::VehicleInput;
use vantage_ride::models::{BookingStatus, Role};
use vantage_ride::screens::auth;
use vantage_ride::screens::book_ride::{BookRideParams, BookRideScreen};
use vantage_ride::screens::driver_notifications::DriverNotificationsScreen;
use vantage_ride::screens::fleet::ManageFleetScreen;
use vantage_ride::screens::my_rides::MyRidesScreen;
use vantage_ride::screens::pilot_routes::PilotRoutesScreen;
use vantage_ride::screens::profile::ProfileScreen;
use vantage_ride::screens::user_notifications::UserNotificationsScreen;
use vantage_ride::state::AppContext;

const PASSWORD: &str = "secret12";

struct Harness {
    ctx: Arc<AppContext>,
    memory: Arc<MemoryBackend>,
    _dir: TempDir,
}

fn harness() -> Harness {
    harness_with(MemoryBackend::default())
}

fn harness_with(memory: MemoryBackend) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let memory = Arc::new(memory);
    let backend: DynBackend = memory.clone();
    let ctx = AppContext::with_backend(Config::in_memory(dir.path().to_path_buf()), backend).unwrap();
    Harness {
        ctx: Arc::new(ctx),
        memory,
        _dir: dir,
    }
}

fn customer_signup() -> SignupInput {
    SignupInput {
        full_name: "Asha Kulkarni".to_string(),
        username: "asha_k".to_string(),
        email: "asha@example.com".to_string(),
        phone_number: "9876543210".to_string(),
        password: PASSWORD.to_string(),
        role: Role::Customer,
        ..SignupInput::default()
    }
}

fn driver_signup() -> SignupInput {
    SignupInput {
        full_name: "Ravi Patil".to_string(),
        username: "ravi_pilot".to_string(),
        email: "ravi@example.com".to_string(),
        phone_number: "9123456780".to_string(),
        password: PASSWORD.to_string(),
        role: Role::Driver,
        license_number: "mh1220240001".to_string(),
        vehicle_model: "Swift Dzire".to_string(),
        vehicle_plate: "mh12ab1234".to_string(),
    }
}

async fn register(h: &Harness, input: SignupInput) -> Uuid {
    auth::sign_up(&h.ctx, &input).await.unwrap();
    let profile = h
        .memory
        .rows("profiles")
        .into_iter()
        .find(|row| row["username"] == input.username.as_str())
        .unwrap();
    profile["id"].as_str().unwrap().parse().unwrap()
}

async fn sign_in(h: &Harness, email: &str) {
    auth::sign_in(
        &h.ctx,
        &LoginInput {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        },
    )
    .await
    .unwrap();
}

fn trip() -> BookingInput {
    BookingInput {
        source_district: "Pune".to_string(),
        source_city: "Kothrud".to_string(),
        destination_district: "Raigad".to_string(),
        destination_city: "Alibag".to_string(),
        date: "2026-11-02".to_string(),
        time: "06:30".to_string(),
    }
}

async fn book(h: &Harness, driver_id: Uuid) -> Uuid {
    let screen = BookRideScreen::new(
        h.ctx.clone(),
        BookRideParams {
            car: Some("Swift Dzire".to_string()),
            driver_id: Some(driver_id),
        },
    );
    screen.submit(&trip()).await.unwrap().id
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn driver_signup_stores_upper_cased_details() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;

    let details = h.memory.rows("driver_details");
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["id"], driver_id.to_string());
    assert_eq!(details[0]["license_number"], "MH1220240001");
    assert_eq!(details[0]["vehicle_plate"], "MH12AB1234");

    register(&h, customer_signup()).await;
    assert_eq!(h.memory.rows("driver_details").len(), 1);
}

#[tokio::test]
async fn booking_flows_from_customer_to_driver_and_back() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    register(&h, customer_signup()).await;

    sign_in(&h, "asha@example.com").await;
    let booking_id = book(&h, driver_id).await;

    let rides = MyRidesScreen::new(h.ctx.clone()).unwrap();
    assert!(matches!(rides.load().await, LoadOutcome::Fetched { count: 1 }));
    let ride = &rides.rides().snapshot()[0];
    assert_eq!(ride.status, BookingStatus::Pending);
    assert_eq!(ride.source_location, "Kothrud, Pune");
    assert_eq!(ride.destination_location, "Alibag, Raigad");

    auth::sign_out(&h.ctx).await.unwrap();
    sign_in(&h, "ravi@example.com").await;

    let requests = DriverNotificationsScreen::new(h.ctx.clone()).unwrap();
    requests.load().await;
    let pending = requests.requests().snapshot();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_name.as_deref(), Some("Asha Kulkarni"));
    assert_eq!(pending[0].user_phone.as_deref(), Some("9876543210"));

    let accepted = requests.accept(booking_id).await.unwrap();
    assert_eq!(accepted.booking.status, BookingStatus::Accepted);
    assert_eq!(accepted.remaining, 0);
    assert!(!accepted.panel_open);

    let history = MyRidesScreen::new(h.ctx.clone()).unwrap();
    history.load().await;
    let driven = &history.rides().snapshot()[0];
    assert_eq!(driven.status, BookingStatus::Accepted);
    assert_eq!(driven.user_name.as_deref(), Some("Asha Kulkarni"));

    let completed = history.complete(booking_id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(history.rides().snapshot()[0].status, BookingStatus::Completed);
}

#[tokio::test]
async fn a_request_is_accepted_only_once() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;
    let booking_id = book(&h, driver_id).await;
    auth::sign_out(&h.ctx).await.unwrap();
    sign_in(&h, "ravi@example.com").await;

    let screen = DriverNotificationsScreen::new(h.ctx.clone()).unwrap();
    screen.load().await;
    screen.accept(booking_id).await.unwrap();

    let err = screen.accept(booking_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(screen.requests().is_empty());

    let err = screen.reject(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn ride_list_follows_status_changes_from_other_clients() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;
    let booking_id = book(&h, driver_id).await;

    let rides = MyRidesScreen::new(h.ctx.clone()).unwrap();
    rides.load().await;
    let listener = rides.listen().await.unwrap();
    settle().await;

    h.memory
        .update(
            "bookings",
            json!({ "status": "accepted" }),
            &[Filter::eq("id", booking_id.to_string())],
        )
        .await
        .unwrap();
    settle().await;

    assert_eq!(rides.rides().snapshot()[0].status, BookingStatus::Accepted);
    assert_eq!(h.ctx.metrics.active_listeners.get(), 1);

    listener.release();
    assert_eq!(h.ctx.metrics.active_listeners.get(), 0);
}

#[tokio::test]
async fn offline_blocks_loading_and_writes() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;
    let booking_id = book(&h, driver_id).await;

    h.ctx.network.set_online(false);

    let rides = MyRidesScreen::new(h.ctx.clone()).unwrap();
    assert!(rides.load().await.is_stale());
    assert!(matches!(
        rides.cancel(booking_id).await.unwrap_err(),
        AppError::Offline(message) if message == "No internet connection! Cannot cancel ride."
    ));

    let screen = BookRideScreen::new(
        h.ctx.clone(),
        BookRideParams {
            car: None,
            driver_id: Some(driver_id),
        },
    );
    assert!(matches!(
        screen.submit(&trip()).await.unwrap_err(),
        AppError::Offline(_)
    ));
    assert_eq!(h.memory.rows("bookings").len(), 1);
}

#[tokio::test]
async fn booking_checks_driver_before_sign_in() {
    let h = harness();
    let screen = BookRideScreen::new(h.ctx.clone(), BookRideParams::default());
    assert!(matches!(
        screen.submit(&trip()).await.unwrap_err(),
        AppError::BadRequest(message) if message.starts_with("Error: No driver selected")
    ));

    let screen = BookRideScreen::new(
        h.ctx.clone(),
        BookRideParams {
            car: None,
            driver_id: Some(Uuid::new_v4()),
        },
    );
    assert!(matches!(
        screen.submit(&trip()).await.unwrap_err(),
        AppError::Unauthorized(_)
    ));
}

#[tokio::test]
async fn locations_are_fetched_once_then_served_from_snapshot() {
    let h = harness();
    h.memory.seed(
        "maharashtra_locations",
        vec![
            json!({ "city_name": "Kothrud", "district": "Pune", "is_active": true }),
            json!({ "city_name": "Alibag", "district": "Raigad", "is_active": true }),
            json!({ "city_name": "Baner", "district": "Pune", "is_active": true }),
            json!({ "city_name": "Closed", "district": "Satara", "is_active": false }),
        ],
    );

    let first = BookRideScreen::new(h.ctx.clone(), BookRideParams::default());
    let view = first.load().await;
    assert!(matches!(view.locations, LoadOutcome::Fetched { count: 3 }));
    assert_eq!(view.districts, vec!["Pune", "Raigad"]);
    assert_eq!(view.car_name, "Premium Fleet");

    h.memory.fail_table("maharashtra_locations", "database unreachable");
    let second = BookRideScreen::new(h.ctx.clone(), BookRideParams::default());
    let view = second.load().await;
    assert!(matches!(view.locations, LoadOutcome::Cached { count: 3 }));
    assert_eq!(second.cities("Pune"), vec!["Baner", "Kothrud"]);
}

#[tokio::test]
async fn dismissed_alerts_stay_hidden() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;
    let first = book(&h, driver_id).await;
    book(&h, driver_id).await;

    let alerts = UserNotificationsScreen::new(h.ctx.clone()).unwrap();
    alerts.load().await;
    let shown = alerts.alerts().snapshot();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].driver_name.as_deref(), Some("Ravi Patil"));

    let outcome = alerts.dismiss(first).unwrap();
    assert_eq!(outcome.remaining, 1);
    assert!(outcome.panel_open);

    let reopened = UserNotificationsScreen::new(h.ctx.clone()).unwrap();
    reopened.load().await;
    let ids: Vec<Uuid> = reopened.alerts().snapshot().iter().map(|b| b.id).collect();
    assert!(!ids.contains(&first));
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn notification_screens_are_role_gated() {
    let h = harness();
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;

    assert!(matches!(
        DriverNotificationsScreen::new(h.ctx.clone()),
        Err(AppError::Forbidden(_))
    ));
    assert!(UserNotificationsScreen::new(h.ctx.clone()).is_ok());
}

#[tokio::test]
async fn failed_vehicle_insert_leaves_the_upload_behind() {
    let h = harness();
    register(&h, driver_signup()).await;
    sign_in(&h, "ravi@example.com").await;
    h.memory.fail_table("fleet", "permission denied");

    let input = VehicleInput {
        name: "Swift Dzire".to_string(),
        rate: Some(12.0),
        ..VehicleInput::default()
    };
    let image = UploadFile {
        name: "dzire.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1, 2, 3],
    };

    let err = ManageFleetScreen::new(h.ctx.clone())
        .publish(&input, Some(image.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Image uploaded, but failed to save vehicle.");
    assert_eq!(h.memory.object_count(), 1);

    h.memory.heal_table("fleet");
    let vehicle = ManageFleetScreen::new(h.ctx.clone())
        .publish(&input, Some(image))
        .await
        .unwrap();
    let url = vehicle.image_url.unwrap();
    assert!(url.starts_with("memory://storage/public/fleet_images/vehicles/"));
    assert!(url.ends_with(".png"));
}

#[tokio::test]
async fn pilot_routes_report_offline_and_gate_broadcasts() {
    let h = harness();
    register(&h, customer_signup()).await;
    register(&h, driver_signup()).await;

    h.ctx.network.set_online(false);
    let view = PilotRoutesScreen::new(h.ctx.clone()).load().await;
    assert_eq!(
        view.error.as_deref(),
        Some("Network disconnected. Please check your internet connection.")
    );
    h.ctx.network.set_online(true);

    let route = RouteInput {
        dest: "Pune ⇄ Lonavala".to_string(),
        km: "200".to_string(),
        price4: Some(3599),
        price6: Some(4500),
    };

    sign_in(&h, "asha@example.com").await;
    assert!(matches!(
        PilotRoutesScreen::new(h.ctx.clone()).broadcast(&route).await,
        Err(AppError::Forbidden(_))
    ));

    auth::sign_out(&h.ctx).await.unwrap();
    sign_in(&h, "ravi@example.com").await;
    let screen = PilotRoutesScreen::new(h.ctx.clone());
    screen.load().await;
    let created = screen.broadcast(&route).await.unwrap();
    assert_eq!(screen.routes()[0].id, created.id);

    screen.delete(created.id).await.unwrap();
    assert!(screen.routes().is_empty());
    assert!(h.memory.rows("routes").is_empty());

    h.memory.fail_table("routes", "relation does not exist");
    let view = PilotRoutesScreen::new(h.ctx.clone()).load().await;
    assert!(view.is_driver);
    assert_eq!(
        view.error.as_deref(),
        Some("Failed to sync routes. The database might be unreachable.")
    );
}

#[tokio::test]
async fn avatar_upload_overwrites_and_busts_the_cache() {
    let h = harness();
    let user_id = register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;

    let mut png = Cursor::new(Vec::new());
    RgbImage::from_pixel(64, 48, Rgb([20, 120, 200]))
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();

    let screen = ProfileScreen::new(h.ctx.clone()).unwrap();
    let first = screen.upload_avatar(png.get_ref()).await.unwrap();
    let second = screen.upload_avatar(png.get_ref()).await.unwrap();
    assert!(first.contains("?t="));
    assert!(second.starts_with(&format!("memory://storage/public/avatars/{user_id}/avatar.jpg?t=")));
    assert_eq!(h.memory.object_count(), 1);

    let stored = h.memory.object("avatars", &format!("{user_id}/avatar.jpg")).unwrap();
    assert_eq!(stored.content_type, "image/jpeg");

    let profile = screen.load().await.unwrap();
    assert_eq!(profile.username, "asha_k");
    assert!(profile.avatar_url.unwrap().contains("/avatars/"));

    let row: Value = h
        .memory
        .rows("profiles")
        .into_iter()
        .find(|row| row["id"] == user_id.to_string())
        .unwrap();
    assert!(!row["avatar_url"].as_str().unwrap().contains("?t="));
}

#[tokio::test]
async fn accepted_request_stays_gone_when_reload_fails() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;
    let booking_id = book(&h, driver_id).await;
    auth::sign_out(&h.ctx).await.unwrap();
    sign_in(&h, "ravi@example.com").await;

    let screen = DriverNotificationsScreen::new(h.ctx.clone()).unwrap();
    screen.load().await;
    screen.accept(booking_id).await.unwrap();

    h.memory.fail_table("bookings", "upstream unavailable");
    assert!(screen.load().await.is_stale());
    assert!(screen.requests().is_empty());

    let reopened = DriverNotificationsScreen::new(h.ctx.clone()).unwrap();
    assert!(reopened.load().await.is_stale());
    assert!(reopened.requests().is_empty());
}

#[tokio::test]
async fn dismissed_alert_stays_gone_when_reload_fails() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;
    let first = book(&h, driver_id).await;
    let second = book(&h, driver_id).await;

    let alerts = UserNotificationsScreen::new(h.ctx.clone()).unwrap();
    alerts.load().await;
    alerts.dismiss(first).unwrap();

    h.memory.fail_table("bookings", "upstream unavailable");
    assert!(alerts.load().await.is_stale());
    let ids: Vec<Uuid> = alerts.alerts().snapshot().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second]);

    let reopened = UserNotificationsScreen::new(h.ctx.clone()).unwrap();
    assert!(reopened.load().await.is_stale());
    let ids: Vec<Uuid> = reopened.alerts().snapshot().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second]);
}

#[tokio::test]
async fn ride_history_is_not_shared_between_accounts() {
    let h = harness();
    let driver_id = register(&h, driver_signup()).await;
    let asha_id = register(&h, customer_signup()).await;
    register(
        &h,
        SignupInput {
            full_name: "Bela Shah".to_string(),
            username: "bela_s".to_string(),
            email: "bela@example.com".to_string(),
            phone_number: "9988776655".to_string(),
            ..customer_signup()
        },
    )
    .await;

    sign_in(&h, "asha@example.com").await;
    book(&h, driver_id).await;
    let rides = MyRidesScreen::new(h.ctx.clone()).unwrap();
    assert!(matches!(rides.load().await, LoadOutcome::Fetched { count: 1 }));
    assert!(h.ctx.session.get(&user_key(HISTORY_KEY, asha_id)).is_some());

    auth::sign_out(&h.ctx).await.unwrap();
    assert!(h.ctx.session.get(&user_key(HISTORY_KEY, asha_id)).is_none());

    sign_in(&h, "bela@example.com").await;
    h.memory.fail_table("bookings", "upstream unavailable");
    let rides = MyRidesScreen::new(h.ctx.clone()).unwrap();
    assert!(rides.load().await.is_stale());
    assert!(rides.rides().is_empty());
}

#[tokio::test]
async fn session_is_refreshed_before_it_expires() {
    let h = harness_with(MemoryBackend::new(1024).with_session_ttl(61));
    register(&h, customer_signup()).await;
    sign_in(&h, "asha@example.com").await;
    let before = h.memory.session().unwrap();

    let keeper = auth::keep_session_fresh(h.ctx.clone());
    tokio::time::sleep(Duration::from_millis(2500)).await;
    keeper.abort();

    let after = h.memory.session().unwrap();
    assert_ne!(after.access_token, before.access_token);
    assert_eq!(after.user.id, before.user.id);
}
