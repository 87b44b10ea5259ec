//! Account model.

use chrono::{DateTime, Utc};

/// A registered account.
///
/// Accounts are created at signup and never modified afterwards.
#[derive(Debug, Clone)]
pub struct User {
    /// Database row ID.
    pub id: i32,
    /// Normalized (trimmed, lower-cased) email address.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Admins may view every answer script.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Normalize an email address the way it is stored.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Whether this user may view a script owned by `owner_id`.
    pub fn can_view(&self, owner_id: i32) -> bool {
        self.is_admin || self.id == owner_id
    }
}
