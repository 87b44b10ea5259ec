//! HTTP request handlers for the web server.

mod auth;
mod pages;
mod scripts;
mod static_files;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use super::session::{consume_flashes, Flashes};
use super::template_structs::ErrorTemplate;

// Re-export handlers for use by the router
pub use auth::{login, login_form, logout, signup, signup_form};
pub use pages::{dashboard, not_found, welcome};
pub use scripts::{evaluate, upload};
pub use static_files::serve_css;

/// Render a page, clearing any flash messages it displayed.
fn render_page<T: Template>(template: &T, flashes: &Flashes) -> Response {
    match template.render() {
        Ok(html) => consume_flashes(Html(html).into_response(), flashes),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            internal_error()
        }
    }
}

fn error_page(status: StatusCode, title: &'static str, message: &str) -> Response {
    let template = ErrorTemplate::new(title, message);
    let html = template.render().unwrap_or_else(|_| message.to_string());
    (status, Html(html)).into_response()
}

/// Generic 500 page. Details are logged by the caller, never shown.
pub fn internal_error() -> Response {
    error_page(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Server Error",
        "Something went wrong while processing your request.",
    )
}

pub fn page_not_found() -> Response {
    error_page(
        StatusCode::NOT_FOUND,
        "Not Found",
        "The page you requested does not exist.",
    )
}
