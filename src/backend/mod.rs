pub mod http;
pub mod memory;
pub mod query;
pub mod socket;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::models::{AuthEvent, ProfileMetadata, Session, User};

pub use http::SupabaseBackend;
pub use memory::MemoryBackend;
pub use query::{Filter, Query};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not signed in")]
    NoSession,
}

impl BackendError {
    pub fn message(&self) -> &str {
        match self {
            BackendError::Api { message, .. } => message,
            BackendError::Transport(message) | BackendError::Decode(message) => message,
            BackendError::NoSession => "not signed in",
        }
    }

    /// Same failure, reported with a screen-specific message.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        match self {
            BackendError::Api { status, .. } => BackendError::Api { status, message },
            BackendError::Transport(_) => BackendError::Transport(message),
            BackendError::Decode(_) => BackendError::Decode(message),
            BackendError::NoSession => BackendError::NoSession,
        }
    }

    pub fn context(self, prefix: &str) -> Self {
        let message = format!("{prefix}: {}", self.message());
        self.with_message(message)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|err| BackendError::Decode(err.to_string())))
        .collect()
}

pub fn encode_row<T: Serialize>(row: &T) -> Result<Value, BackendError> {
    serde_json::to_value(row).map_err(|err| BackendError::Decode(err.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn extension(&self) -> &str {
        self.name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("bin")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOptions {
    pub upsert: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    pub record: Value,
    pub old_record: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Only(ChangeKind),
}

impl EventFilter {
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventFilter::All => "*",
            EventFilter::Only(kind) => kind.as_str(),
        }
    }
}

/// Server-side selection of change events for one realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFilter {
    pub event: EventFilter,
    pub schema: String,
    pub table: String,
    pub row_eq: Option<(String, String)>,
}

impl ChangeFilter {
    pub fn table(table: &str) -> Self {
        Self {
            event: EventFilter::All,
            schema: "public".to_string(),
            table: table.to_string(),
            row_eq: None,
        }
    }

    pub fn on(mut self, kind: ChangeKind) -> Self {
        self.event = EventFilter::Only(kind);
        self
    }

    pub fn row_eq(mut self, column: &str, value: impl ToString) -> Self {
        self.row_eq = Some((column.to_string(), value.to_string()));
        self
    }

    pub fn wire_filter(&self) -> Option<String> {
        self.row_eq
            .as_ref()
            .map(|(column, value)| format!("{column}=eq.{value}"))
    }

    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table || event.schema != self.schema {
            return false;
        }

        if let EventFilter::Only(kind) = self.event {
            if kind != event.kind {
                return false;
            }
        }

        match &self.row_eq {
            None => true,
            Some((column, expected)) => {
                let row = if event.kind == ChangeKind::Delete {
                    &event.old_record
                } else {
                    &event.record
                };
                row.get(column)
                    .map(|value| value_as_text(value) == *expected)
                    .unwrap_or(false)
            }
        }
    }
}

pub(crate) fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Live change-feed subscription. Dropping it releases the channel.
pub struct Subscription {
    channel: String,
    events: mpsc::Receiver<ChangeEvent>,
    release: Option<oneshot::Sender<()>>,
}

impl Subscription {
    pub fn new(
        channel: String,
        events: mpsc::Receiver<ChangeEvent>,
        release: oneshot::Sender<()>,
    ) -> Self {
        Self {
            channel,
            events,
            release: Some(release),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
            debug!(channel = %self.channel, "realtime channel released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &ProfileMetadata,
        redirect_to: &str,
    ) -> Result<SignUpResponse, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Locally held session; never touches the network.
    fn session(&self) -> Option<Session>;

    async fn refresh_session(&self) -> Result<Session, BackendError>;

    fn auth_changes(&self) -> broadcast::Receiver<AuthEvent>;
}

#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError>;

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, BackendError>;

    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;

    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, BackendError>;
}

#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: UploadFile,
        options: UploadOptions,
    ) -> Result<(), BackendError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[async_trait]
pub trait RealtimeApi: Send + Sync {
    async fn subscribe(
        &self,
        channel: &str,
        filter: ChangeFilter,
    ) -> Result<Subscription, BackendError>;
}

pub trait Backend: AuthApi + TableApi + StorageApi + RealtimeApi {}

impl<T> Backend for T where T: AuthApi + TableApi + StorageApi + RealtimeApi {}

pub type DynBackend = Arc<dyn Backend>;
