use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;

/// A fixed-price round trip published by a driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutePackage {
    pub id: Uuid,
    pub dest: String,
    pub km: String,
    pub price4: u32,
    pub price6: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for RoutePackage {
    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoute {
    pub dest: String,
    pub km: String,
    pub price4: u32,
    pub price6: u32,
}
