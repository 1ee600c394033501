use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use serde::Serialize;

use crate::error::AppError;
use crate::forms::profile::ProfileUpdate;
use crate::screens::profile::{ProfileScreen, ProfileView};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/profile", get(load_profile).put(update_profile))
        .route("/profile/avatar", post(upload_avatar))
}

#[derive(Serialize)]
pub struct ProfileSaved {
    pub message: &'static str,
    pub profile: ProfileUpdate,
}

#[derive(Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

async fn load_profile(State(ctx): State<Arc<AppContext>>) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(ProfileScreen::new(ctx)?.load().await?))
}

async fn update_profile(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<ProfileSaved>, AppError> {
    let profile = ProfileScreen::new(ctx)?.update(&payload).await?;
    Ok(Json(ProfileSaved {
        message: "Pilot Profile Updated Successfully!",
        profile,
    }))
}

/// The request body is the raw image file.
async fn upload_avatar(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<Json<AvatarResponse>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("No image selected.".to_string()));
    }
    let avatar_url = ProfileScreen::new(ctx)?.upload_avatar(&body).await?;
    Ok(Json(AvatarResponse { avatar_url }))
}
