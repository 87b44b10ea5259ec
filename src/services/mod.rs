//! Grading services shared by the web server and the CLI.

pub mod evaluator;
pub mod grading;

pub use evaluator::{extract_total_marks, Evaluator, MARKS_UNAVAILABLE};
pub use grading::{assemble_answer, GradingService, PreparedScript};
