pub mod loader;

use uuid::Uuid;

pub use loader::{CachedCollection, LoadOutcome, RefreshPolicy};

pub const LOCATIONS_KEY: &str = "vantage_locations_cache";
pub const FLEET_KEY: &str = "vantage_fleet_cache";
pub const ROUTES_KEY: &str = "vantage_routes_cache";
pub const HISTORY_KEY: &str = "vantage_history_cache";
pub const DRIVER_REQUESTS_KEY: &str = "vantage_driver_requests";
pub const USER_ALERTS_KEY: &str = "vantage_user_alerts";
pub const DISMISSED_KEY: &str = "dismissed_notifications";
pub const APP_INITIALIZED_KEY: &str = "app_initialized";

/// Snapshot keys holding one account's rows.
pub const USER_SCOPED_KEYS: [&str; 3] = [HISTORY_KEY, DRIVER_REQUESTS_KEY, USER_ALERTS_KEY];

/// `<base>:<user id>`, so one account never hydrates another's rows.
pub fn user_key(base: &str, user_id: Uuid) -> String {
    format!("{base}:{user_id}")
}
