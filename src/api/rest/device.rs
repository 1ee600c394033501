use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crate::platform::Theme;
use crate::screens::startup::{self, StartupView};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/network", get(network).put(set_network))
        .route("/startup", get(startup_view).post(finish_startup))
        .route("/theme", get(theme).post(toggle_theme))
}

#[derive(Serialize, Deserialize)]
pub struct NetworkState {
    pub online: bool,
}

#[derive(Serialize)]
pub struct ThemeResponse {
    pub theme: Theme,
    pub body_class: &'static str,
}

impl From<Theme> for ThemeResponse {
    fn from(theme: Theme) -> Self {
        Self {
            theme,
            body_class: theme.body_class(),
        }
    }
}

async fn network(State(ctx): State<Arc<AppContext>>) -> Json<NetworkState> {
    Json(NetworkState {
        online: ctx.network.is_online(),
    })
}

/// The host reports connectivity changes here.
async fn set_network(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<NetworkState>,
) -> Json<NetworkState> {
    ctx.network.set_online(payload.online);
    Json(payload)
}

async fn startup_view(State(ctx): State<Arc<AppContext>>) -> Json<StartupView> {
    Json(startup::view(&ctx))
}

async fn finish_startup(State(ctx): State<Arc<AppContext>>) -> Json<StartupView> {
    Json(startup::finish(&ctx))
}

async fn theme(State(ctx): State<Arc<AppContext>>) -> Json<ThemeResponse> {
    Json(ctx.theme.current().into())
}

async fn toggle_theme(State(ctx): State<Arc<AppContext>>) -> Json<ThemeResponse> {
    Json(ctx.theme.toggle().into())
}
