use std::sync::Arc;

use tracing::info;

use crate::backend::{AuthApi, DynBackend, MemoryBackend, SupabaseBackend};
use crate::config::{BackendMode, Config};
use crate::engine::{ContactDetails, FareTable};
use crate::error::AppError;
use crate::models::User;
use crate::observability::metrics::Metrics;
use crate::platform::{FileSnapshotStore, MemorySnapshotStore, NetworkStatus, SnapshotStore, ThemeState};

/// Application-root context handed to every screen.
pub struct AppContext {
    pub config: Config,
    pub backend: DynBackend,
    /// Survives restarts (locations, dismissed notifications).
    pub durable: Arc<dyn SnapshotStore>,
    /// Lives for this run only (fleet, routes, ride lists, loader flag).
    pub session: Arc<dyn SnapshotStore>,
    pub network: NetworkStatus,
    pub theme: ThemeState,
    pub fares: FareTable,
    pub contacts: ContactDetails,
    pub metrics: Metrics,
}

impl AppContext {
    pub fn new(
        config: Config,
        backend: DynBackend,
        durable: Arc<dyn SnapshotStore>,
        session: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            config,
            backend,
            durable,
            session,
            network: NetworkStatus::default(),
            theme: ThemeState::default(),
            fares: FareTable::standard(),
            contacts: ContactDetails::default(),
            metrics: Metrics::new(),
        }
    }

    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let backend: DynBackend = match config.backend {
            BackendMode::Supabase => {
                let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_key) else {
                    return Err(AppError::Internal(
                        "SUPABASE_URL and SUPABASE_KEY are required when BACKEND=supabase"
                            .to_string(),
                    ));
                };
                Arc::new(SupabaseBackend::new(url, key, config.event_buffer_size))
            }
            BackendMode::Memory => Arc::new(MemoryBackend::new(config.event_buffer_size)),
        };

        Self::with_backend(config, backend)
    }

    /// Durable snapshots under `CACHE_DIR`, session snapshots in memory.
    pub fn with_backend(config: Config, backend: DynBackend) -> Result<Self, AppError> {
        let quota = Some(config.snapshot_quota_bytes);
        let durable = FileSnapshotStore::open(&config.cache_dir, &config.app_origin, quota)?;
        let session = MemorySnapshotStore::with_quota(config.snapshot_quota_bytes);

        info!(
            backend = ?config.backend,
            cache_dir = %config.cache_dir.display(),
            "application context ready"
        );

        Ok(Self::new(config, backend, Arc::new(durable), Arc::new(session)))
    }

    /// Signed-in user from the locally held session.
    pub fn current_user(&self) -> Option<User> {
        self.backend.session().map(|session| session.user)
    }

    pub fn require_user(&self, message: &str) -> Result<User, AppError> {
        self.current_user()
            .ok_or_else(|| AppError::Unauthorized(message.to_string()))
    }
}
