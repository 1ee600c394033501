use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    pub name: String,
    #[serde(rename = "type")]
    pub class: String,
    pub rate_per_km: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min_package_km: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn active_by_default() -> bool {
    true
}

impl Record for Vehicle {
    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVehicle {
    pub driver_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub class: String,
    pub rate_per_km: f64,
    pub description: String,
    pub min_package_km: f64,
    pub image_url: String,
    pub is_active: bool,
}
