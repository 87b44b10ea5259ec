//! Askama template structs for the web interface.
//!
//! Each struct corresponds to an HTML template in the templates/ directory.
//! All pages extend `base.html`, which reads `title`, `flashes` and `user`.

use askama::Template;

use super::session::Flash;
use crate::models::{AnswerScript, User};
use crate::services::{extract_total_marks, MARKS_UNAVAILABLE};

/// Account shown in the navigation bar.
pub struct NavUser {
    pub email: String,
    pub is_admin: bool,
}

impl From<&User> for NavUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Row in the dashboard script list.
pub struct ScriptRow {
    pub id: i32,
    pub filename: String,
    pub owner_id: i32,
    pub created: String,
    pub marks: String,
}

impl From<&AnswerScript> for ScriptRow {
    fn from(script: &AnswerScript) -> Self {
        Self {
            id: script.id,
            filename: script.filename.clone(),
            owner_id: script.user_id,
            created: script.created_at.format("%Y-%m-%d %H:%M").to_string(),
            marks: script
                .cached_evaluation()
                .map(extract_total_marks)
                .unwrap_or_else(|| MARKS_UNAVAILABLE.to_string()),
        }
    }
}

#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomeTemplate {
    pub title: &'static str,
    pub flashes: Vec<Flash>,
    pub user: Option<NavUser>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub title: &'static str,
    pub flashes: Vec<Flash>,
    pub user: Option<NavUser>,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub title: &'static str,
    pub flashes: Vec<Flash>,
    pub user: Option<NavUser>,
}

/// Upload form and script list.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub title: &'static str,
    pub flashes: Vec<Flash>,
    pub user: Option<NavUser>,
    pub scripts: Vec<ScriptRow>,
    pub show_owner: bool,
}

/// Evaluation result for one script.
#[derive(Template)]
#[template(path = "evaluate.html")]
pub struct EvaluateTemplate {
    pub title: &'static str,
    pub flashes: Vec<Flash>,
    pub user: Option<NavUser>,
    pub script_id: i32,
    pub filename: String,
    pub total_marks: String,
    /// Escaped HTML with bold spans rendered.
    pub evaluation_html: String,
    pub extracted_text: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: &'static str,
    pub flashes: Vec<Flash>,
    pub user: Option<NavUser>,
    pub message: String,
}

impl ErrorTemplate {
    pub fn new(title: &'static str, message: impl Into<String>) -> Self {
        Self {
            title,
            flashes: Vec::new(),
            user: None,
            message: message.into(),
        }
    }
}
