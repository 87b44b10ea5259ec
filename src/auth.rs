//! Accounts and sessions.
//!
//! Passwords are stored as Argon2 PHC strings. A successful login creates a
//! server-side session row whose random token is handed to the browser.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use tracing::info;

use crate::models::User;
use crate::repository::{DbContext, DbError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("User already exists. Please login.")]
    UserExists,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    // 16 random bytes from a v4 UUID
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Signup, login and session lookup.
#[derive(Clone)]
pub struct AuthService {
    db: DbContext,
    admin_email: String,
}

impl AuthService {
    pub fn new(db: DbContext, admin_email: &str) -> Self {
        Self {
            db,
            admin_email: User::normalize_email(admin_email),
        }
    }

    /// Create an account. The configured admin email gets the admin flag.
    pub async fn signup(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.create_user(email, password, false).await
    }

    /// Create an account, optionally forcing the admin flag.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        force_admin: bool,
    ) -> Result<User, AuthError> {
        let email = User::normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let users = self.db.users();
        if users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let is_admin = force_admin || email == self.admin_email;
        let hash = hash_password(password)?;

        match users.create(&email, &hash, is_admin).await {
            Ok(user) => {
                info!("Created user {} (admin: {})", user.email, user.is_admin);
                Ok(user)
            }
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(AuthError::UserExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and open a session. Returns the user and session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = User::normalize_email(email);

        let user = match self.db.users().find_by_email(&email).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => return Err(AuthError::InvalidCredentials),
        };

        let token = self.db.sessions().create(user.id).await?;
        info!("User {} logged in", user.email);
        Ok((user, token))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.db.sessions().delete(token).await?;
        Ok(())
    }

    pub async fn current_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        Ok(self.db.sessions().user_for_token(token).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::context::test_support::test_context;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not a hash"));
    }

    #[tokio::test]
    async fn test_signup_rules() {
        let (db, _dir) = test_context().await;
        let auth = AuthService::new(db, "Admin@Example.com");

        let user = auth.signup("  Alice@Example.COM ", "pw").await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.is_admin);

        assert!(matches!(
            auth.signup("alice@example.com", "other").await,
            Err(AuthError::UserExists)
        ));
        assert!(matches!(
            auth.signup("   ", "pw").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.signup("bob@example.com", "").await,
            Err(AuthError::MissingCredentials)
        ));

        let admin = auth.signup("admin@example.com", "pw").await.unwrap();
        assert!(admin.is_admin);
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let (db, _dir) = test_context().await;
        let auth = AuthService::new(db, "admin@example.com");
        auth.signup("carol@example.com", "secret").await.unwrap();

        assert!(matches!(
            auth.login("carol@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "secret").await,
            Err(AuthError::InvalidCredentials)
        ));

        let (user, token) = auth.login(" CAROL@example.com", "secret").await.unwrap();
        assert_eq!(user.email, "carol@example.com");
        let current = auth.current_user(&token).await.unwrap().unwrap();
        assert_eq!(current.id, user.id);

        auth.logout(&token).await.unwrap();
        assert!(auth.current_user(&token).await.unwrap().is_none());
    }

    #[test]
    fn test_error_messages_match_flashes() {
        assert_eq!(
            AuthError::MissingCredentials.to_string(),
            "Email and password are required."
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password."
        );
    }
}
