use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new_local(email: &str, username: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            username: username.trim().to_string(),
            google_id: None,
            password_hash: Some(password_hash),
            created_at: Utc::now(),
        }
    }

    pub fn new_google(email: &str, username: &str, google_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            username: username.trim().to_string(),
            google_id: Some(google_id.to_string()),
            password_hash: None,
            created_at: Utc::now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
