use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};

use crate::error::AppError;
use crate::forms::booking::BookingInput;
use crate::models::Booking;
use crate::screens::book_ride::{BookRideParams, BookRideScreen, BookRideView};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/locations", get(locations))
        .route("/locations/:district/cities", get(cities))
        .route("/bookings", post(create_booking))
}

async fn locations(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<BookRideParams>,
) -> Json<BookRideView> {
    Json(BookRideScreen::new(ctx, params).load().await)
}

async fn cities(
    State(ctx): State<Arc<AppContext>>,
    Path(district): Path<String>,
) -> Json<Vec<String>> {
    let screen = BookRideScreen::new(ctx, BookRideParams::default());
    screen.load().await;
    Json(screen.cities(&district))
}

/// `car` and `driver_id` arrive as query parameters from the fleet card.
async fn create_booking(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<BookRideParams>,
    Json(payload): Json<BookingInput>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = BookRideScreen::new(ctx, params).submit(&payload).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}
