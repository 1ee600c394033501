use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::LoadOutcome;
use crate::error::AppError;
use crate::models::Booking;
use crate::screens::driver_notifications::{DriverNotificationsScreen, RequestOutcome};
use crate::screens::user_notifications::{DismissOutcome, UserNotificationsScreen};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/notifications/driver", get(driver_requests))
        .route("/notifications/driver/:id/accept", post(accept_request))
        .route("/notifications/driver/:id/reject", post(reject_request))
        .route("/notifications/user", get(user_alerts))
        .route("/notifications/user/:id/dismiss", post(dismiss_alert))
}

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub count: usize,
    pub items: Vec<Booking>,
    #[serde(flatten)]
    pub outcome: LoadOutcome,
}

impl NotificationsResponse {
    fn new(items: Vec<Booking>, outcome: LoadOutcome) -> Self {
        Self {
            count: items.len(),
            items,
            outcome,
        }
    }
}

async fn driver_requests(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let screen = DriverNotificationsScreen::new(ctx)?;
    let outcome = screen.load().await;
    Ok(Json(NotificationsResponse::new(
        screen.requests().snapshot(),
        outcome,
    )))
}

async fn accept_request(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestOutcome>, AppError> {
    let screen = DriverNotificationsScreen::new(ctx)?;
    screen.load().await;
    Ok(Json(screen.accept(id).await?))
}

async fn reject_request(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestOutcome>, AppError> {
    let screen = DriverNotificationsScreen::new(ctx)?;
    screen.load().await;
    Ok(Json(screen.reject(id).await?))
}

async fn user_alerts(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let screen = UserNotificationsScreen::new(ctx)?;
    let outcome = screen.load().await;
    Ok(Json(NotificationsResponse::new(
        screen.alerts().snapshot(),
        outcome,
    )))
}

async fn dismiss_alert(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DismissOutcome>, AppError> {
    let screen = UserNotificationsScreen::new(ctx)?;
    screen.load().await;
    Ok(Json(screen.dismiss(id)?))
}
