//! Login session repository.
//!
//! Sessions are opaque random tokens stored server-side; the browser only
//! holds the token in an HttpOnly cookie.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{SessionRecord, UserRecord};
use super::pool::{DbError, DbPool};
use super::util::now_rfc3339;
use crate::models::User;
use crate::schema::{sessions, users};

/// Diesel-based session repository.
#[derive(Clone)]
pub struct SessionRepository {
    pool: DbPool,
}

impl SessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a session for a user and return its token.
    pub async fn create(&self, user_id: i32) -> Result<String, DbError> {
        let mut conn = self.pool.get().await?;
        let token = uuid::Uuid::new_v4().simple().to_string();
        let created_at = now_rfc3339();

        diesel::insert_into(sessions::table)
            .values((
                sessions::token.eq(&token),
                sessions::user_id.eq(user_id),
                sessions::created_at.eq(&created_at),
            ))
            .execute(&mut conn)
            .await?;

        Ok(token)
    }

    /// Resolve a session token to its user.
    pub async fn user_for_token(&self, token: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.get().await?;

        sessions::table
            .inner_join(users::table)
            .filter(sessions::token.eq(token))
            .select(UserRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    /// Get the raw session record.
    pub async fn get(&self, token: &str) -> Result<Option<SessionRecord>, DbError> {
        let mut conn = self.pool.get().await?;

        sessions::table
            .find(token)
            .select(SessionRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
    }

    /// Delete a session. Returns whether a row was removed.
    pub async fn delete(&self, token: &str) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(sessions::table.find(token))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }
}
