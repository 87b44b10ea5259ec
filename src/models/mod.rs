//! Data models for Gradebook.

mod answer_script;
mod user;

pub use answer_script::{AnswerScript, NewAnswerScript};
pub use user::User;
