use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::socket::{self, SocketConfig};
use super::{
    AuthApi, BackendError, ChangeFilter, Filter, Query, RealtimeApi, SignUpResponse, StorageApi,
    Subscription, TableApi, UploadFile, UploadOptions,
};
use crate::models::{AuthEvent, ProfileMetadata, Session, User};

/// Hosted backend reached over its REST, auth, storage and realtime endpoints.
pub struct SupabaseBackend {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    session: RwLock<Option<Session>>,
    auth_events: broadcast::Sender<AuthEvent>,
    event_buffer_size: usize,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
            user: token.user,
        }
    }
}

impl SupabaseBackend {
    pub fn new(base_url: &str, api_key: &str, event_buffer_size: usize) -> Self {
        let (auth_events, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
            session: RwLock::new(None),
            auth_events,
            event_buffer_size,
        }
    }

    fn bearer(&self) -> String {
        self.session()
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.api_key.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
    }

    fn rest(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{table}"))
    }

    fn store_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn announce(&self, event: AuthEvent) {
        let _ = self.auth_events.send(event);
    }

    fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };

        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.api_key
        )
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| (filter.column().to_string(), filter.expression()))
        .collect()
}

/// Turns a non-success response into an error carrying the backend's message.
async fn check(res: Response) -> Result<Response, BackendError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn rows(res: Response) -> Result<Vec<Value>, BackendError> {
    let res = check(res).await?;
    let body = res.text().await?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(row) => Ok(vec![row]),
        Err(err) => Err(BackendError::Decode(err.to_string())),
    }
}

#[async_trait]
impl AuthApi for SupabaseBackend {
    #[tracing::instrument(skip(self, password, metadata))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &ProfileMetadata,
        redirect_to: &str,
    ) -> Result<SignUpResponse, BackendError> {
        let res = self
            .request(Method::POST, "/auth/v1/signup")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await?;

        let body: Value = check(res).await?.json().await?;

        // Confirmed projects return a session; otherwise the body is the bare user.
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|err| BackendError::Decode(err.to_string()))?;
            let session: Session = token.into();
            self.store_session(Some(session.clone()));
            self.announce(AuthEvent::SignedIn(session.clone()));
            return Ok(SignUpResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user_value = body.get("user").cloned().unwrap_or(body);
        let user = serde_json::from_value::<User>(user_value).ok();
        Ok(SignUpResponse {
            user,
            session: None,
        })
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let res = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let token: TokenResponse = check(res).await?.json().await?;
        let session: Session = token.into();

        self.store_session(Some(session.clone()));
        self.announce(AuthEvent::SignedIn(session.clone()));
        info!(user_id = %session.user.id, "signed in");

        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.session().is_some() {
            let res = self.request(Method::POST, "/auth/v1/logout").send().await?;
            if let Err(err) = check(res).await {
                warn!(error = %err, "remote sign-out failed; clearing local session anyway");
            }
        }

        self.store_session(None);
        self.announce(AuthEvent::SignedOut);
        Ok(())
    }

    fn session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn refresh_session(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .session()
            .and_then(|session| session.refresh_token)
            .ok_or(BackendError::NoSession)?;

        let res = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let token: TokenResponse = check(res).await?.json().await?;
        let session: Session = token.into();

        self.store_session(Some(session.clone()));
        self.announce(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn auth_changes(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }
}

#[async_trait]
impl TableApi for SupabaseBackend {
    #[tracing::instrument(skip(self), fields(table = %query.table))]
    async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
        let res = self
            .rest(Method::GET, &query.table)
            .query(&query.to_params())
            .send()
            .await?;

        rows(res).await
    }

    #[tracing::instrument(skip(self, rows_in))]
    async fn insert(&self, table: &str, rows_in: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let res = self
            .rest(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&rows_in)
            .send()
            .await?;

        rows(res).await
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError> {
        let res = self
            .rest(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&filter_params(filters))
            .json(&patch)
            .send()
            .await?;

        rows(res).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        let res = self
            .rest(Method::DELETE, table)
            .query(&filter_params(filters))
            .send()
            .await?;

        check(res).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, rows_in))]
    async fn upsert(&self, table: &str, rows_in: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let res = self
            .rest(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&rows_in)
            .send()
            .await?;

        rows(res).await
    }
}

#[async_trait]
impl StorageApi for SupabaseBackend {
    #[tracing::instrument(skip(self, file), fields(size = file.bytes.len()))]
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: UploadFile,
        options: UploadOptions,
    ) -> Result<(), BackendError> {
        let res = self
            .request(Method::POST, &format!("/storage/v1/object/{bucket}/{path}"))
            .header("Content-Type", file.content_type)
            .header("x-upsert", if options.upsert { "true" } else { "false" })
            .body(file.bytes)
            .send()
            .await?;

        check(res).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }
}

#[async_trait]
impl RealtimeApi for SupabaseBackend {
    async fn subscribe(
        &self,
        channel: &str,
        filter: ChangeFilter,
    ) -> Result<Subscription, BackendError> {
        socket::open_channel(SocketConfig {
            url: self.realtime_url(),
            channel: channel.to_string(),
            filter,
            access_token: self.bearer(),
            buffer: self.event_buffer_size.max(1),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::SupabaseBackend;
    use crate::backend::{AuthApi, StorageApi};

    #[test]
    fn public_url_is_built_locally() {
        let backend = SupabaseBackend::new("https://demo.supabase.co/", "anon", 16);
        assert_eq!(
            backend.public_url("avatars", "u-1/avatar.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/avatars/u-1/avatar.jpg"
        );
        assert!(backend.session().is_none());
    }

    #[test]
    fn realtime_url_switches_scheme() {
        let backend = SupabaseBackend::new("https://demo.supabase.co", "anon", 16);
        assert_eq!(
            backend.realtime_url(),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }
}
