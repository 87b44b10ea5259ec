//! User repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{NewUser, UserRecord};
use super::pool::{DbError, DbPool};
use super::util::{now_rfc3339, parse_datetime};
use crate::models::User;
use crate::schema::users;

/// Convert a database record to a domain model.
impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            email: record.email,
            password_hash: record.password_hash,
            is_admin: record.is_admin != 0,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

/// Diesel-based user repository.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. The email must already be normalized.
    ///
    /// Fails with a unique-violation database error if the email is taken.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, DbError> {
        let mut conn = self.pool.get().await?;
        let created_at = now_rfc3339();

        diesel::insert_into(users::table)
            .values(&NewUser {
                email,
                password_hash,
                is_admin: i32::from(is_admin),
                created_at: &created_at,
            })
            .returning(UserRecord::as_returning())
            .get_result(&mut conn)
            .await
            .map(User::from)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: i32) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.get().await?;

        users::table
            .find(id)
            .select(UserRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    /// Look up a user by normalized email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.get().await?;

        users::table
            .filter(users::email.eq(email))
            .select(UserRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    /// List all users, oldest first.
    pub async fn list(&self) -> Result<Vec<User>, DbError> {
        let mut conn = self.pool.get().await?;

        users::table
            .order(users::id.asc())
            .select(UserRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(User::from).collect())
    }
}
