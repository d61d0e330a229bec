//! User and journal data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::JournHasher;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: usize,
    pub email: String,
    pub username: String,
    #[serde(rename = "phone_number")]
    pub contact: Option<String>,
    pub activated: bool,
    pub created: DateTime<Utc>,
}

/// Everything needed to insert a user row together with its first
/// verification code.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub contact: Option<String>,
    pub credentials: PasswordCredentials,
    pub verification_code: String,
    pub verification_issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    pub salt: String,
    pub hash: String,
    pub hasher: JournHasher,
}

/// The activation state of a user, as seen by the verification workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub user_id: usize,
    pub email: String,
    pub username: String,
    pub code: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub activated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDetailsUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
}

impl UserDetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.phone_number.is_none()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Category {
    pub id: usize,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: usize,
    pub title: String,
    pub content: String,
    pub category_id: Option<usize>,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJournalEntry {
    pub title: String,
    pub content: String,
    pub category_id: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalEntryUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<usize>,
}
