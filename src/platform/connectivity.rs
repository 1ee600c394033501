use tokio::sync::watch;
use tracing::info;

use crate::error::AppError;

pub const OFFLINE_MESSAGE: &str = "Network disconnected. Please check your internet connection.";

/// Online/offline flag with change notification.
#[derive(Clone)]
pub struct NetworkStatus {
    online: watch::Sender<bool>,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        let (online, _unused_rx) = watch::channel(online);
        Self { online }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });

        if changed {
            info!(online, "network status changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Blocks an operation locally instead of attempting it while offline.
    pub fn require_online(&self, message: &str) -> Result<(), AppError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(AppError::Offline(message.to_string()))
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}
