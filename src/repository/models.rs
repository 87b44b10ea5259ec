//! Diesel ORM models for database tables.
//!
//! These models provide compile-time type checking for database operations.

use diesel::prelude::*;

use crate::schema;

/// User record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRecord {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub is_admin: i32,
    pub created_at: String,
}

/// New user for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_admin: i32,
    pub created_at: &'a str,
}

/// Answer script record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::answer_scripts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AnswerScriptRecord {
    pub id: i32,
    pub user_id: i32,
    pub filename: String,
    pub file_path: String,
    pub kb_text: String,
    pub extracted_text: String,
    pub evaluation: Option<String>,
    pub created_at: String,
}

/// New answer script for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::answer_scripts)]
pub struct NewAnswerScriptRecord<'a> {
    pub user_id: i32,
    pub filename: &'a str,
    pub file_path: &'a str,
    pub kb_text: &'a str,
    pub extracted_text: &'a str,
    pub created_at: &'a str,
}

/// Session record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SessionRecord {
    pub token: String,
    pub user_id: i32,
    pub created_at: String,
}
