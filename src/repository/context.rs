//! Database context for managing connections and repository access.
//!
//! Provides a unified entry point for database operations using Diesel ORM.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::answer_script::AnswerScriptRepository;
use super::pool::{DbError, DbPool};
use super::session::SessionRepository;
use super::user::UserRepository;

/// Database context that owns the connection factory and hands out repositories.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_path(&db_path);
/// ctx.init_schema().await?;
/// let user = ctx.users().find_by_email("a@example.com").await?;
/// ```
#[derive(Clone, Debug)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a new database context from a file path.
    pub fn from_path(db_path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(db_path),
        }
    }

    /// Create a new database context from a `sqlite:` URL or plain path.
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: DbPool::new(database_url),
        }
    }

    /// Get the underlying connection factory.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a user repository.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Get an answer script repository.
    pub fn scripts(&self) -> AnswerScriptRepository {
        AnswerScriptRepository::new(self.pool.clone())
    }

    /// Get a session repository.
    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.pool.clone())
    }

    /// Initialize all database schemas.
    ///
    /// This creates the necessary tables if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(
            r#"
            -- Accounts
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- Uploaded answer scripts and their cached evaluation
            CREATE TABLE IF NOT EXISTS answer_scripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                filename TEXT NOT NULL,
                file_path TEXT NOT NULL,
                kb_text TEXT NOT NULL DEFAULT '',
                extracted_text TEXT NOT NULL DEFAULT '',
                evaluation TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_answer_scripts_user ON answer_scripts(user_id);

            -- Login sessions
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            "#,
        )
        .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::DbContext;
    use tempfile::TempDir;

    /// Fresh database in a temporary directory.
    pub async fn test_context() -> (DbContext, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_context;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let (ctx, _dir) = test_context().await;
        ctx.init_schema().await.unwrap();
        assert!(ctx.users().find_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
