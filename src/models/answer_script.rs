//! Answer script model.
//!
//! One row per upload: the knowledge-base text, the combined answer text
//! extracted from every answer file, and the evaluation once computed.

use chrono::{DateTime, Utc};

/// A stored upload and its (possibly pending) evaluation.
#[derive(Debug, Clone)]
pub struct AnswerScript {
    /// Database row ID, used as the public script identifier.
    pub id: i32,
    /// Uploader.
    pub user_id: i32,
    /// Sanitized filename of the first answer file.
    pub filename: String,
    /// Path of the first answer file relative to the upload root's parent,
    /// e.g. `uploads/<upload_id>/<filename>`.
    pub file_path: String,
    /// Knowledge-base text (may be empty if extraction failed).
    pub kb_text: String,
    /// Combined answer text from direct extraction and OCR.
    pub extracted_text: String,
    /// Evaluation text, written once on first view.
    pub evaluation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnswerScript {
    /// The cached evaluation, if one has been computed.
    ///
    /// An empty stored value counts as not evaluated.
    pub fn cached_evaluation(&self) -> Option<&str> {
        self.evaluation.as_deref().filter(|e| !e.is_empty())
    }
}

/// Values for a new answer script row.
#[derive(Debug, Clone)]
pub struct NewAnswerScript {
    pub user_id: i32,
    pub filename: String,
    pub file_path: String,
    pub kb_text: String,
    pub extracted_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_evaluation_ignores_empty() {
        let mut script = AnswerScript {
            id: 1,
            user_id: 1,
            filename: "a.pdf".to_string(),
            file_path: "uploads/x/a.pdf".to_string(),
            kb_text: String::new(),
            extracted_text: "answer".to_string(),
            evaluation: None,
            created_at: Utc::now(),
        };
        assert_eq!(script.cached_evaluation(), None);

        script.evaluation = Some(String::new());
        assert_eq!(script.cached_evaluation(), None);

        script.evaluation = Some("**Total Marks: 30/50**".to_string());
        assert_eq!(script.cached_evaluation(), Some("**Total Marks: 30/50**"));
    }
}
