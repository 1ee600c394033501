use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Serialize;

use crate::error::AppError;
use crate::forms::login::LoginInput;
use crate::forms::signup::SignupInput;
use crate::screens::auth::{self, AuthOutcome, SessionView};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(sign_in))
        .route("/auth/logout", post(sign_out))
        .route("/auth/session", get(session))
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session: Option<SessionView>,
    /// Where a guest-only page should send this visitor instead.
    pub guest_redirect: Option<&'static str>,
}

async fn sign_up(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<SignupInput>,
) -> Result<(StatusCode, Json<AuthOutcome>), AppError> {
    let outcome = auth::sign_up(&ctx, &payload).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn sign_in(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<LoginInput>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(auth::sign_in(&ctx, &payload).await?))
}

async fn sign_out(State(ctx): State<Arc<AppContext>>) -> Result<Json<AuthOutcome>, AppError> {
    Ok(Json(auth::sign_out(&ctx).await?))
}

async fn session(State(ctx): State<Arc<AppContext>>) -> Json<SessionResponse> {
    Json(SessionResponse {
        session: auth::session(&ctx),
        guest_redirect: auth::guest_guard(&ctx),
    })
}
