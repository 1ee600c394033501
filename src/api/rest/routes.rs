use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use uuid::Uuid;

use crate::error::AppError;
use crate::forms::route::RouteInput;
use crate::models::RoutePackage;
use crate::screens::pilot_routes::{PilotRoutesScreen, PilotRoutesView};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/routes", get(list_routes).post(broadcast_route))
        .route("/routes/:id", delete(delete_route))
}

async fn list_routes(State(ctx): State<Arc<AppContext>>) -> Json<PilotRoutesView> {
    Json(PilotRoutesScreen::new(ctx).load().await)
}

async fn broadcast_route(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<RouteInput>,
) -> Result<(StatusCode, Json<RoutePackage>), AppError> {
    let route = PilotRoutesScreen::new(ctx).broadcast(&payload).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

async fn delete_route(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PilotRoutesScreen::new(ctx).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
