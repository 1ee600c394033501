use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::patch::merge_record;
use crate::backend::{
    BackendError, ChangeEvent, ChangeFilter, ChangeKind, DynBackend, RealtimeApi, value_as_text,
};
use crate::cache::CachedCollection;
use crate::models::Record;
use crate::observability::metrics::Metrics;

pub type ReloadFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// How a screen folds a change event into its visible rows.
#[derive(Clone)]
pub enum Reconcile {
    Patch,
    Reload(ReloadFn),
}

#[derive(Debug, Clone)]
pub struct ListenerSpec {
    pub channel: String,
    pub filter: ChangeFilter,
    /// Client-side guard: `record[field]` must equal the value.
    pub match_field: Option<(String, String)>,
}

impl ListenerSpec {
    pub fn new(channel: &str, filter: ChangeFilter) -> Self {
        Self {
            channel: channel.to_string(),
            filter,
            match_field: None,
        }
    }

    pub fn matching(mut self, field: &str, value: impl ToString) -> Self {
        self.match_field = Some((field.to_string(), value.to_string()));
        self
    }

    fn admits(&self, event: &ChangeEvent) -> bool {
        match &self.match_field {
            None => true,
            Some((field, expected)) => event
                .record
                .get(field)
                .map(|value| value_as_text(value) == *expected)
                .unwrap_or(false),
        }
    }
}

/// Owns the listening task; releasing or dropping it closes the channel.
pub struct ListenerHandle {
    channel: String,
    task: Option<JoinHandle<()>>,
    metrics: Metrics,
}

impl ListenerHandle {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.metrics.active_listeners.dec();
            info!(channel = %self.channel, "listener released");
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub async fn listen<T: Record>(
    backend: &DynBackend,
    spec: ListenerSpec,
    rows: Arc<CachedCollection<T>>,
    reconcile: Reconcile,
    metrics: Metrics,
) -> Result<ListenerHandle, BackendError> {
    let mut subscription = backend.subscribe(&spec.channel, spec.filter.clone()).await?;
    let channel = spec.channel.clone();
    let task_metrics = metrics.clone();

    let task = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let action = apply(&spec, &rows, &reconcile, &event).await;
            task_metrics
                .realtime_events_total
                .with_label_values(&[&spec.channel, action])
                .inc();
        }
        debug!(channel = %spec.channel, "change feed closed");
    });

    metrics.active_listeners.inc();
    info!(channel = %channel, "listener started");

    Ok(ListenerHandle {
        channel,
        task: Some(task),
        metrics,
    })
}

async fn apply<T: Record>(
    spec: &ListenerSpec,
    rows: &CachedCollection<T>,
    reconcile: &Reconcile,
    event: &ChangeEvent,
) -> &'static str {
    if !spec.admits(event) {
        return "ignored";
    }

    match reconcile {
        Reconcile::Patch => {
            if event.kind == ChangeKind::Delete {
                return "ignored";
            }

            let mut failure = None;
            let patched = rows.modify(|current| match merge_record(current, &event.record) {
                Ok(applied) => applied,
                Err(err) => {
                    failure = Some(err);
                    false
                }
            });

            if let Some(err) = failure {
                warn!(channel = %spec.channel, error = %err, "unreadable change event");
                return "ignored";
            }

            if patched { "patched" } else { "ignored" }
        }
        Reconcile::Reload(reload) => {
            reload().await;
            "reloaded"
        }
    }
}
