//! Answer script repository.
//!
//! The evaluation column is write-once: `store_evaluation` only fills it
//! while it is NULL or empty, so a second evaluation can never replace a
//! cached one.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{AnswerScriptRecord, NewAnswerScriptRecord};
use super::pool::{DbError, DbPool};
use super::util::{now_rfc3339, parse_datetime};
use crate::models::{AnswerScript, NewAnswerScript};
use crate::schema::answer_scripts;

/// Convert a database record to a domain model.
impl From<AnswerScriptRecord> for AnswerScript {
    fn from(record: AnswerScriptRecord) -> Self {
        AnswerScript {
            id: record.id,
            user_id: record.user_id,
            filename: record.filename,
            file_path: record.file_path,
            kb_text: record.kb_text,
            extracted_text: record.extracted_text,
            evaluation: record.evaluation,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

/// Diesel-based answer script repository.
#[derive(Clone)]
pub struct AnswerScriptRepository {
    pool: DbPool,
}

impl AnswerScriptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new script with no evaluation.
    pub async fn create(&self, script: &NewAnswerScript) -> Result<AnswerScript, DbError> {
        let mut conn = self.pool.get().await?;
        let created_at = now_rfc3339();

        diesel::insert_into(answer_scripts::table)
            .values(&NewAnswerScriptRecord {
                user_id: script.user_id,
                filename: &script.filename,
                file_path: &script.file_path,
                kb_text: &script.kb_text,
                extracted_text: &script.extracted_text,
                created_at: &created_at,
            })
            .returning(AnswerScriptRecord::as_returning())
            .get_result(&mut conn)
            .await
            .map(AnswerScript::from)
    }

    /// Get a script by ID.
    pub async fn get(&self, id: i32) -> Result<Option<AnswerScript>, DbError> {
        let mut conn = self.pool.get().await?;

        answer_scripts::table
            .find(id)
            .select(AnswerScriptRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(AnswerScript::from))
    }

    /// Scripts uploaded by one user, newest first.
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<AnswerScript>, DbError> {
        let mut conn = self.pool.get().await?;

        answer_scripts::table
            .filter(answer_scripts::user_id.eq(user_id))
            .order(answer_scripts::id.desc())
            .select(AnswerScriptRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(AnswerScript::from).collect())
    }

    /// All scripts, newest first.
    pub async fn list_all(&self) -> Result<Vec<AnswerScript>, DbError> {
        let mut conn = self.pool.get().await?;

        answer_scripts::table
            .order(answer_scripts::id.desc())
            .select(AnswerScriptRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(AnswerScript::from).collect())
    }

    /// Store an evaluation unless one is already cached.
    ///
    /// Returns the evaluation that is stored after the call: `evaluation`
    /// if this call wrote it, otherwise the previously cached text.
    /// Returns `NotFound` if the script does not exist.
    pub async fn store_evaluation(&self, id: i32, evaluation: &str) -> Result<String, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(
            answer_scripts::table
                .find(id)
                .filter(
                    answer_scripts::evaluation
                        .is_null()
                        .or(answer_scripts::evaluation.assume_not_null().eq("")),
                ),
        )
        .set(answer_scripts::evaluation.eq(Some(evaluation)))
        .execute(&mut conn)
        .await?;

        if rows > 0 {
            return Ok(evaluation.to_string());
        }

        let stored: Option<String> = answer_scripts::table
            .find(id)
            .select(answer_scripts::evaluation)
            .first(&mut conn)
            .await?;

        Ok(stored.unwrap_or_default())
    }
}
