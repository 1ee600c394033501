pub mod auth;
pub mod bookings;
pub mod device;
pub mod fares;
pub mod fleet;
pub mod notifications;
pub mod profile;
pub mod rides;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::state::AppContext;

pub fn router(ctx: Arc<AppContext>) -> Router {
    let static_dir = ctx.config.static_dir.clone();

    Router::new()
        .merge(auth::router())
        .merge(fares::router())
        .merge(bookings::router())
        .merge(rides::router())
        .merge(notifications::router())
        .merge(fleet::router())
        .merge(routes::router())
        .merge(profile::router())
        .merge(device::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws/rides", get(ws::rides_feed))
        .route("/ws/notifications/driver", get(ws::driver_feed))
        .route("/ws/notifications/user", get(ws::user_feed))
        .with_state(ctx)
        .fallback_service(ServeDir::new(static_dir))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    online: bool,
    signed_in: bool,
    active_listeners: i64,
}

async fn health(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        online: ctx.network.is_online(),
        signed_in: ctx.current_user().is_some(),
        active_listeners: ctx.metrics.active_listeners.get(),
    })
}

async fn metrics(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match ctx.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
