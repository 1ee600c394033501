use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl User {
    pub fn role(&self) -> Role {
        self.user_metadata
            .get("role")
            .cloned()
            .and_then(|role| serde_json::from_value(role).ok())
            .unwrap_or_default()
    }

    pub fn is_driver(&self) -> bool {
        self.role() == Role::Driver
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}
