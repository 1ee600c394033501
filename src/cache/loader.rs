use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::Record;
use crate::observability::metrics::Metrics;
use crate::platform::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Fetch on every load, even when a snapshot was shown first.
    Always,
    /// Skip the fetch entirely when a snapshot exists.
    WhenMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Fetched { count: usize },
    Cached { count: usize },
    Stale { error: String },
}

impl LoadOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, LoadOutcome::Stale { .. })
    }
}

/// Visible state for one screen collection, backed by a snapshot key.
pub struct CachedCollection<T: Record> {
    key: String,
    store: Arc<dyn SnapshotStore>,
    state: watch::Sender<Vec<T>>,
    hydrated: AtomicBool,
    metrics: Metrics,
}

impl<T: Record> CachedCollection<T> {
    pub fn new(key: &str, store: Arc<dyn SnapshotStore>, metrics: Metrics) -> Self {
        let (state, _unused_rx) = watch::channel(Vec::new());
        Self {
            key: key.to_string(),
            store,
            state,
            hydrated: AtomicBool::new(false),
            metrics,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.state.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.state.subscribe()
    }

    /// Applies the stored snapshot, if any, to the visible state.
    pub fn hydrate(&self) -> Option<Vec<T>> {
        self.hydrated.store(true, Ordering::SeqCst);
        let raw = self.store.get(&self.key)?;

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(rows) => {
                self.metrics
                    .snapshot_hits_total
                    .with_label_values(&[&self.key])
                    .inc();
                debug!(key = %self.key, count = rows.len(), "snapshot applied");
                self.state.send_replace(rows.clone());
                Some(rows)
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "discarding corrupt snapshot");
                self.store.remove(&self.key);
                None
            }
        }
    }

    /// Hydrates only the first time it is called on this collection. Later
    /// reloads keep whatever is visible instead of rolling back to the snapshot.
    pub fn hydrate_once(&self) -> Option<Vec<T>> {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.hydrate()
    }

    /// Replaces the visible state and overwrites the snapshot.
    pub fn replace(&self, rows: Vec<T>) {
        self.persist(&rows);
        self.state.send_replace(rows);
    }

    /// Runs `fetch`; a failure keeps whatever is currently visible.
    pub async fn refresh<F, Fut>(&self, fetch: F) -> LoadOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, AppError>>,
    {
        let started = Instant::now();
        let result = fetch().await;
        self.metrics
            .fetch_latency_seconds
            .with_label_values(&[&self.key])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(rows) => {
                let count = rows.len();
                self.metrics
                    .fetch_total
                    .with_label_values(&[&self.key, "fetched"])
                    .inc();
                self.replace(rows);
                LoadOutcome::Fetched { count }
            }
            Err(err) => {
                self.metrics
                    .fetch_total
                    .with_label_values(&[&self.key, "failed"])
                    .inc();
                warn!(key = %self.key, error = %err, "fetch failed, keeping last known rows");
                LoadOutcome::Stale {
                    error: err.user_message(),
                }
            }
        }
    }

    pub async fn load<F, Fut>(&self, policy: RefreshPolicy, fetch: F) -> LoadOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, AppError>>,
    {
        self.hydrate_once();

        if policy == RefreshPolicy::WhenMissing && self.store.get(&self.key).is_some() {
            return LoadOutcome::Cached { count: self.len() };
        }

        self.refresh(fetch).await
    }

    /// Mutates the visible state in place and rewrites the snapshot when
    /// `apply` reports a change.
    pub fn modify<F>(&self, apply: F) -> bool
    where
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        let changed = self.state.send_if_modified(apply);
        if changed {
            self.persist(&self.snapshot());
        }
        changed
    }

    fn persist(&self, rows: &[T]) {
        let encoded = match serde_json::to_string(rows) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to encode snapshot");
                return;
            }
        };

        if let Err(err) = self.store.set(&self.key, &encoded) {
            warn!(key = %self.key, error = %err, "snapshot write failed");
        }
    }
}
