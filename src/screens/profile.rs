use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{cache_buster, fetch_rows};
use crate::backend::{BackendError, Filter, Query, StorageApi, TableApi, UploadOptions};
use crate::error::AppError;
use crate::forms::profile::{ProfileForm, ProfileUpdate};
use crate::models::{Role, User};
use crate::platform::avatar::prepare_avatar;
use crate::platform::connectivity::OFFLINE_MESSAGE;
use crate::state::AppContext;

pub const AVATAR_BUCKET: &str = "avatars";

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    is_verified: Option<bool>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileView {
    pub username: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: Role,
    pub is_verified: bool,
    /// Carries a `?t=` suffix so a replaced picture is fetched again.
    pub avatar_url: Option<String>,
}

impl From<ProfileRow> for ProfileView {
    fn from(row: ProfileRow) -> Self {
        Self {
            username: row.username.unwrap_or_default(),
            full_name: row.full_name.unwrap_or_default(),
            phone_number: row.phone_number.unwrap_or_default(),
            role: row.role.unwrap_or_default(),
            is_verified: row.is_verified.unwrap_or(false),
            avatar_url: row
                .avatar_url
                .filter(|url| !url.is_empty())
                .map(|url| cache_buster(&url)),
        }
    }
}

pub struct ProfileScreen {
    ctx: Arc<AppContext>,
    user: User,
}

impl ProfileScreen {
    pub fn new(ctx: Arc<AppContext>) -> Result<Self, AppError> {
        let user = ctx.require_user("Please sign in to manage your profile.")?;
        Ok(Self { ctx, user })
    }

    pub async fn load(&self) -> Result<ProfileView, AppError> {
        let query = Query::from("profiles")
            .select("username, full_name, phone_number, role, is_verified, avatar_url")
            .eq("id", self.user.id.to_string());
        let rows: Vec<ProfileRow> = fetch_rows(&self.ctx.backend, &query).await?;

        rows.into_iter()
            .next()
            .map(ProfileView::from)
            .ok_or_else(|| AppError::NotFound("Profile not found.".to_string()))
    }

    pub async fn update(&self, input: &ProfileUpdate) -> Result<ProfileUpdate, AppError> {
        self.ctx.network.require_online(OFFLINE_MESSAGE)?;
        let update = ProfileForm::new().submit(input)?;

        let row = json!({
            "id": self.user.id,
            "username": update.username,
            "full_name": update.full_name,
            "phone_number": update.phone_number,
            "updated_at": Utc::now(),
        });
        self.ctx
            .backend
            .upsert("profiles", vec![row])
            .await
            .map_err(|err| AppError::Backend(err.context("Error updating profile")))?;

        info!(user_id = %self.user.id, "profile updated");
        Ok(update)
    }

    /// Resizes the picture, overwrites `<uid>/avatar.jpg` and records its URL.
    pub async fn upload_avatar(&self, bytes: &[u8]) -> Result<String, AppError> {
        self.ctx
            .network
            .require_online("Cannot upload avatar while offline.")?;

        let file = prepare_avatar(bytes).map_err(|err| {
            warn!(error = %err, "avatar image rejected");
            AppError::BadRequest(format!("Sync Failed: {err}"))
        })?;

        let path = format!("{}/avatar.jpg", self.user.id);
        let sync_failed = |err: BackendError| AppError::Backend(err.context("Sync Failed"));

        self.ctx
            .backend
            .upload(AVATAR_BUCKET, &path, file, UploadOptions { upsert: true })
            .await
            .map_err(sync_failed)?;

        let url = self.ctx.backend.public_url(AVATAR_BUCKET, &path);
        self.ctx
            .backend
            .update(
                "profiles",
                json!({ "avatar_url": url }),
                &[Filter::eq("id", self.user.id.to_string())],
            )
            .await
            .map_err(sync_failed)?;

        info!(user_id = %self.user.id, "avatar replaced");
        Ok(cache_buster(&url))
    }
}
