use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{AuthApi, BackendError, TableApi, encode_row};
use crate::error::AppError;
use crate::forms::login::{LoginForm, LoginInput};
use crate::forms::signup::{SignupForm, SignupInput};
use crate::cache::{USER_SCOPED_KEYS, user_key};
use crate::models::{AuthEvent, DriverDetails, Role, Session};
use crate::platform::connectivity::OFFLINE_MESSAGE;
use crate::state::AppContext;

pub const SIGNUP_SUCCESS: &str = "Registration Successful! Please check your email.";
const EMAIL_NOT_CONFIRMED: &str = "ACCESS DENIED: Please verify your email link.";
const BAD_CREDENTIALS: &str = "AUTH FAILURE: Credentials do not match our manifest.";
/// Access tokens are refreshed this long before they expire.
pub const REFRESH_MARGIN_SECS: i64 = 60;
const REFRESH_RETRY: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub message: String,
    pub redirect: Option<String>,
}

/// What the navigation shell needs to know about the signed-in account.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionView {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub expires_at: Option<i64>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user.id,
            email: session.user.email.clone(),
            role: session.user.role(),
            expires_at: session.expires_at,
        }
    }
}

pub async fn sign_up(ctx: &AppContext, input: &SignupInput) -> Result<AuthOutcome, AppError> {
    let mut form = SignupForm::new();
    form.fill(input);
    let request = form.submit()?;
    ctx.network.require_online(OFFLINE_MESSAGE)?;

    let redirect_to = format!("{}/login", ctx.config.app_origin.trim_end_matches('/'));
    let response = ctx
        .backend
        .sign_up(&request.email, &request.password, &request.metadata, &redirect_to)
        .await
        .map_err(registration_error)?;

    if let Some(driver) = request.driver {
        let Some(user) = response.user else {
            warn!("sign-up returned no user; driver details not stored");
            return Err(AppError::Backend(registration_error_message(
                "account created without a user id",
            )));
        };

        // The profile row is created by a trigger after sign-up returns.
        tokio::time::sleep(Duration::from_millis(ctx.config.driver_details_delay_ms)).await;

        let details = DriverDetails {
            id: user.id,
            license_number: driver.license_number,
            vehicle_model: driver.vehicle_model,
            vehicle_plate: driver.vehicle_plate,
        };
        ctx.backend
            .insert("driver_details", vec![encode_row(&details)?])
            .await
            .map_err(registration_error)?;
        info!(user_id = %user.id, "driver details stored");
    }

    info!(role = %request.metadata.role, "account registered");
    Ok(AuthOutcome {
        message: SIGNUP_SUCCESS.to_string(),
        redirect: Some("/login".to_string()),
    })
}

fn registration_error(err: BackendError) -> AppError {
    AppError::Backend(err.context("REGISTRATION ERROR"))
}

fn registration_error_message(message: &str) -> BackendError {
    BackendError::Api {
        status: 500,
        message: format!("REGISTRATION ERROR: {message}"),
    }
}

pub async fn sign_in(ctx: &AppContext, input: &LoginInput) -> Result<SessionView, AppError> {
    let credentials = LoginForm::new().submit(input)?;
    ctx.network.require_online(OFFLINE_MESSAGE)?;

    let session = ctx
        .backend
        .sign_in(&credentials.email, &credentials.password)
        .await
        .map_err(sign_in_error)?;

    info!(user_id = %session.user.id, role = %session.user.role(), "signed in");
    Ok(SessionView::from(&session))
}

/// Rewords the two failures users actually hit; anything else passes through.
pub fn sign_in_error(err: BackendError) -> AppError {
    let lowered = err.message().to_lowercase();
    if lowered.contains("email not confirmed") {
        AppError::Unauthorized(EMAIL_NOT_CONFIRMED.to_string())
    } else if lowered.contains("invalid login credentials") {
        AppError::Unauthorized(BAD_CREDENTIALS.to_string())
    } else {
        AppError::Backend(err)
    }
}

pub async fn sign_out(ctx: &AppContext) -> Result<AuthOutcome, AppError> {
    let leaving = ctx.current_user();
    ctx.backend.sign_out().await?;

    if let Some(user) = leaving {
        for base in USER_SCOPED_KEYS {
            ctx.session.remove(&user_key(base, user.id));
        }
        info!(user_id = %user.id, "signed out");
    }
    Ok(AuthOutcome {
        message: "Signed out.".to_string(),
        redirect: Some("/login".to_string()),
    })
}

pub fn session(ctx: &AppContext) -> Option<SessionView> {
    ctx.backend.session().as_ref().map(SessionView::from)
}

/// Login and signup are for guests only; signed-in users go home.
pub fn guest_guard(ctx: &AppContext) -> Option<&'static str> {
    ctx.backend.session().map(|_| "/")
}

/// Time left before a token expiring at `expires_at` should be refreshed.
pub fn refresh_delay(expires_at: i64, now: i64) -> Duration {
    let secs = (expires_at - REFRESH_MARGIN_SECS - now).max(0);
    Duration::from_secs(secs.unsigned_abs())
}

async fn refresh_due(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

/// Keeps the access token fresh for as long as someone is signed in, and
/// logs every auth state change. Abort the handle to stop.
pub fn keep_session_fresh(ctx: Arc<AppContext>) -> JoinHandle<()> {
    let mut changes = ctx.backend.auth_changes();

    tokio::spawn(async move {
        loop {
            let delay = ctx
                .backend
                .session()
                .and_then(|session| session.expires_at)
                .map(|expires_at| refresh_delay(expires_at, Utc::now().timestamp()));

            tokio::select! {
                event = changes.recv() => match event {
                    Ok(AuthEvent::SignedIn(session)) => {
                        debug!(user_id = %session.user.id, "auth: signed in");
                    }
                    Ok(AuthEvent::TokenRefreshed(session)) => {
                        debug!(user_id = %session.user.id, expires_at = ?session.expires_at, "auth: token refreshed");
                    }
                    Ok(AuthEvent::SignedOut) => debug!("auth: signed out"),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth events lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = refresh_due(delay) => {
                    if let Err(err) = ctx.backend.refresh_session().await {
                        warn!(error = %err, "session refresh failed, retrying");
                        tokio::time::sleep(REFRESH_RETRY).await;
                    }
                }
            }
        }
    })
}
