use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub city_name: String,
    pub district: String,
}

impl Record for Location {
    fn record_id(&self) -> String {
        format!("{}/{}", self.district, self.city_name)
    }
}
