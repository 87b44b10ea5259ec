//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! against a SQLite database.

pub mod answer_script;
pub mod context;
pub mod models;
pub mod pool;
pub mod session;
pub mod user;
pub mod util;

pub use answer_script::AnswerScriptRepository;
pub use context::DbContext;
pub use pool::{DbError, DbPool};
pub use session::SessionRepository;
pub use user::UserRepository;
