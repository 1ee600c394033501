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
use crate::screens::my_rides::MyRidesScreen;
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/rides", get(list_rides))
        .route("/rides/:id/cancel", post(cancel_ride))
        .route("/rides/:id/complete", post(complete_ride))
}

#[derive(Serialize)]
pub struct RidesResponse {
    pub is_driver: bool,
    pub rides: Vec<Booking>,
    #[serde(flatten)]
    pub outcome: LoadOutcome,
}

#[derive(Serialize)]
pub struct RideUpdate {
    pub message: &'static str,
    pub ride: Booking,
}

async fn list_rides(State(ctx): State<Arc<AppContext>>) -> Result<Json<RidesResponse>, AppError> {
    let screen = MyRidesScreen::new(ctx)?;
    let outcome = screen.load().await;

    Ok(Json(RidesResponse {
        is_driver: screen.is_driver(),
        rides: screen.rides().snapshot(),
        outcome,
    }))
}

async fn cancel_ride(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RideUpdate>, AppError> {
    let ride = MyRidesScreen::new(ctx)?.cancel(id).await?;
    Ok(Json(RideUpdate {
        message: "Mission aborted successfully.",
        ride,
    }))
}

async fn complete_ride(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RideUpdate>, AppError> {
    let ride = MyRidesScreen::new(ctx)?.complete(id).await?;
    Ok(Json(RideUpdate {
        message: "Mission Accomplished!",
        ride,
    }))
}
