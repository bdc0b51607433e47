//! Minimal user identity carried in messages, notifications and typing events.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserSummary {
    pub fn new(id: Option<i64>, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            name: None,
        }
    }
}
