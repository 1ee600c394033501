use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::get;

use crate::backend::UploadFile;
use crate::error::AppError;
use crate::forms::vehicle::VehicleInput;
use crate::models::Vehicle;
use crate::screens::fleet::ManageFleetScreen;
use crate::screens::home::{HomeScreen, HomeView};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new().route("/fleet", get(home).post(publish_vehicle))
}

async fn home(State(ctx): State<Arc<AppContext>>) -> Result<Json<HomeView>, AppError> {
    Ok(Json(HomeScreen::new(ctx).load().await?))
}

/// Multipart form: `name`, `type`, `rate`, `minPkg`, `desc` and an `image` file.
async fn publish_vehicle(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let mut input = VehicleInput::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("malformed upload: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().unwrap_or("image.bin").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::BadRequest(format!("unreadable image: {err}")))?;
            if !bytes.is_empty() {
                image = Some(UploadFile {
                    name: file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|err| AppError::BadRequest(format!("unreadable field {name}: {err}")))?;
        match name.as_str() {
            "name" => input.name = text,
            "type" if !text.trim().is_empty() => input.class = text,
            "rate" => input.rate = text.trim().parse().ok(),
            "minPkg" => {
                if let Ok(km) = text.trim().parse() {
                    input.min_package_km = km;
                }
            }
            "desc" => input.desc = text,
            _ => {}
        }
    }

    let vehicle = ManageFleetScreen::new(ctx).publish(&input, image).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}
