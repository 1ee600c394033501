use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use super::{
    AuthApi, BackendError, ChangeEvent, ChangeFilter, ChangeKind, Filter, Query, RealtimeApi,
    SignUpResponse, StorageApi, Subscription, TableApi, UploadFile, UploadOptions,
};
use crate::models::{AuthEvent, ProfileMetadata, Session, User};

struct Account {
    password: String,
    user: User,
}

/// In-process stand-in for the hosted backend: tables, accounts, objects and
/// a change feed, with switchable failures per table.
pub struct MemoryBackend {
    tables: DashMap<String, Vec<Value>>,
    accounts: DashMap<String, Account>,
    objects: DashMap<String, UploadFile>,
    failing: DashMap<String, String>,
    session: RwLock<Option<Session>>,
    changes: broadcast::Sender<ChangeEvent>,
    auth_events: broadcast::Sender<AuthEvent>,
    event_buffer_size: usize,
    session_ttl_secs: i64,
}

impl MemoryBackend {
    pub fn new(event_buffer_size: usize) -> Self {
        let buffer = event_buffer_size.max(1);
        let (changes, _unused_changes) = broadcast::channel(buffer);
        let (auth_events, _unused_auth) = broadcast::channel(buffer);

        Self {
            tables: DashMap::new(),
            accounts: DashMap::new(),
            objects: DashMap::new(),
            failing: DashMap::new(),
            session: RwLock::new(None),
            changes,
            auth_events,
            event_buffer_size: buffer,
            session_ttl_secs: 3600,
        }
    }

    /// Lifetime of the access tokens this backend issues.
    pub fn with_session_ttl(mut self, secs: i64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    /// Seeds rows without emitting change events.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables.entry(table.to_string()).or_default().extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<UploadFile> {
        self.objects
            .get(&object_key(bucket, path))
            .map(|entry| entry.value().clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Every subsequent operation on `table` fails with `message` until healed.
    pub fn fail_table(&self, table: &str, message: &str) {
        self.failing.insert(table.to_string(), message.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        self.failing.remove(table);
    }

    /// Pushes a change to subscribers as if another client had written it.
    pub fn emit(&self, event: ChangeEvent) {
        let _ = self.changes.send(event);
    }

    pub fn register_account(&self, email: &str, password: &str, metadata: &ProfileMetadata) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: json!(metadata),
        };
        self.accounts.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    fn guard(&self, table: &str) -> Result<(), BackendError> {
        match self.failing.get(table) {
            Some(message) => Err(BackendError::Api {
                status: 503,
                message: message.value().clone(),
            }),
            None => Ok(()),
        }
    }

    fn publish(&self, kind: ChangeKind, table: &str, record: Value, old_record: Value) {
        let _ = self.changes.send(ChangeEvent {
            kind,
            schema: "public".to_string(),
            table: table.to_string(),
            record,
            old_record,
        });
    }

    fn store_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn issue_session(&self, user: User) -> Session {
        Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_at: Some(Utc::now().timestamp() + self.session_ttl_secs),
            user,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn object_key(bucket: &str, path: &str) -> String {
    format!("{bucket}/{path}")
}

fn stamp(mut row: Value) -> Result<Value, BackendError> {
    let Some(fields) = row.as_object_mut() else {
        return Err(BackendError::Api {
            status: 400,
            message: "row must be a JSON object".to_string(),
        });
    };
    fields
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    fields
        .entry("created_at")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    Ok(row)
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &ProfileMetadata,
        _redirect_to: &str,
    ) -> Result<SignUpResponse, BackendError> {
        if self.accounts.contains_key(&email.to_lowercase()) {
            return Err(BackendError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let user = self.register_account(email, password, metadata);

        // Mirrors the profile row a database trigger would create.
        self.seed(
            "profiles",
            vec![json!({
                "id": user.id.to_string(),
                "username": metadata.username,
                "full_name": metadata.full_name,
                "phone_number": metadata.phone_number,
                "role": metadata.role,
                "is_verified": false,
                "avatar_url": null,
            })],
        );

        Ok(SignUpResponse {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let user = match self.accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => account.user.clone(),
            _ => {
                return Err(BackendError::Api {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                });
            }
        };

        let session = self.issue_session(user);
        self.store_session(Some(session.clone()));
        let _ = self.auth_events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.store_session(None);
        let _ = self.auth_events.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn refresh_session(&self) -> Result<Session, BackendError> {
        let current = self.session().ok_or(BackendError::NoSession)?;
        let session = self.issue_session(current.user);
        self.store_session(Some(session.clone()));
        let _ = self.auth_events.send(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn auth_changes(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }
}

#[async_trait]
impl TableApi for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
        self.guard(&query.table)?;
        let rows = self.rows(&query.table);
        Ok(query.apply(&rows))
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        self.guard(table)?;

        let stamped = rows.into_iter().map(stamp).collect::<Result<Vec<_>, _>>()?;
        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(stamped.iter().cloned());

        for row in &stamped {
            self.publish(ChangeKind::Insert, table, row.clone(), Value::Null);
        }

        Ok(stamped)
    }

    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError> {
        self.guard(table)?;

        let mut changed = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(table) {
            for row in rows.iter_mut() {
                if filters.iter().all(|filter| filter.matches(row)) {
                    let old = row.clone();
                    merge(row, &patch);
                    changed.push((row.clone(), old));
                }
            }
        }

        for (record, old) in &changed {
            self.publish(ChangeKind::Update, table, record.clone(), old.clone());
        }

        Ok(changed.into_iter().map(|(record, _)| record).collect())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        self.guard(table)?;

        let mut removed = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(table) {
            rows.retain(|row| {
                let matched = filters.iter().all(|filter| filter.matches(row));
                if matched {
                    removed.push(row.clone());
                }
                !matched
            });
        }

        for old in removed {
            self.publish(ChangeKind::Delete, table, Value::Null, old);
        }

        Ok(())
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        self.guard(table)?;

        let mut written = Vec::new();
        for row in rows {
            let id = row.get("id").cloned();
            let existing = id.as_ref().and_then(|id| {
                let filter = Filter::Eq("id".to_string(), id.clone());
                self.tables
                    .get(table)
                    .and_then(|rows| rows.iter().position(|r| filter.matches(r)))
            });

            match (id, existing) {
                (Some(id), Some(_)) => {
                    let filters = [Filter::Eq("id".to_string(), id)];
                    written.extend(self.update(table, row, &filters).await?);
                }
                _ => written.extend(self.insert(table, vec![row]).await?),
            }
        }

        Ok(written)
    }
}

#[async_trait]
impl StorageApi for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: UploadFile,
        options: UploadOptions,
    ) -> Result<(), BackendError> {
        self.guard(bucket)?;

        let key = object_key(bucket, path);
        if !options.upsert && self.objects.contains_key(&key) {
            return Err(BackendError::Api {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }

        self.objects.insert(key, file);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://storage/public/{bucket}/{path}")
    }
}

#[async_trait]
impl RealtimeApi for MemoryBackend {
    async fn subscribe(
        &self,
        channel: &str,
        filter: ChangeFilter,
    ) -> Result<Subscription, BackendError> {
        let mut feed = self.changes.subscribe();
        let (events_tx, events_rx) = mpsc::channel(self.event_buffer_size);
        let (release_tx, mut release_rx) = oneshot::channel::<()>();
        let name = channel.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut release_rx => break,
                    received = feed.recv() => match received {
                        Ok(event) => {
                            if filter.accepts(&event) && events_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(channel = %name, skipped, "memory change feed lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        Ok(Subscription::new(channel.to_string(), events_rx, release_tx))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::MemoryBackend;
    use crate::backend::{AuthApi, ChangeFilter, ChangeKind, Filter, Query, RealtimeApi, TableApi};
    use crate::models::{AuthEvent, ProfileMetadata, Role};

    #[tokio::test]
    async fn insert_assigns_ids_and_update_merges_fields() {
        let backend = MemoryBackend::default();
        let inserted = backend
            .insert("bookings", vec![json!({ "status": "pending", "car_name": "Swift Dzire" })])
            .await
            .unwrap();
        let id = inserted[0]["id"].clone();
        assert!(id.is_string());

        let updated = backend
            .update(
                "bookings",
                json!({ "status": "accepted" }),
                &[Filter::Eq("id".to_string(), id.clone())],
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["status"], "accepted");
        assert_eq!(updated[0]["car_name"], "Swift Dzire");
    }

    #[tokio::test]
    async fn failing_table_reports_message() {
        let backend = MemoryBackend::default();
        backend.fail_table("routes", "database unreachable");

        let err = backend.select(&Query::from("routes")).await.unwrap_err();
        assert_eq!(err.message(), "database unreachable");

        backend.heal_table("routes");
        assert!(backend.select(&Query::from("routes")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscription_receives_filtered_changes() {
        let backend = MemoryBackend::default();
        let mut subscription = backend
            .subscribe("history-updates", ChangeFilter::table("bookings").on(ChangeKind::Update))
            .await
            .unwrap();

        backend
            .insert("bookings", vec![json!({ "id": "b-1", "status": "pending" })])
            .await
            .unwrap();
        backend
            .update(
                "bookings",
                json!({ "status": "accepted" }),
                &[Filter::eq("id", "b-1")],
            )
            .await
            .unwrap();

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.record["status"], "accepted");
        assert_eq!(event.old_record["status"], "pending");
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn auth_changes_follow_the_session_lifecycle() {
        let backend = MemoryBackend::default();
        let mut changes = backend.auth_changes();
        let metadata = ProfileMetadata {
            full_name: "Ravi Patil".to_string(),
            username: "ravi_pilot".to_string(),
            phone_number: "9123456780".to_string(),
            role: Role::Driver,
        };
        backend.register_account("ravi@example.com", "secret12", &metadata);

        let signed_in = backend.sign_in("ravi@example.com", "secret12").await.unwrap();
        let refreshed = backend.refresh_session().await.unwrap();
        backend.sign_out().await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), AuthEvent::SignedIn(signed_in.clone()));
        assert_eq!(changes.recv().await.unwrap(), AuthEvent::TokenRefreshed(refreshed.clone()));
        assert_eq!(changes.recv().await.unwrap(), AuthEvent::SignedOut);

        assert_ne!(refreshed.access_token, signed_in.access_token);
        assert_eq!(refreshed.user, signed_in.user);
        assert!(backend.session().is_none());
        assert!(backend.refresh_session().await.is_err());
    }
}
