//! Welcome, dashboard and fallback pages.

use axum::{extract::State, response::Response};
use tracing::error;

use super::super::session::{CurrentUser, Flashes, MaybeUser};
use super::super::template_structs::{DashboardTemplate, NavUser, ScriptRow, WelcomeTemplate};
use super::super::AppState;
use super::{internal_error, page_not_found, render_page};

pub async fn welcome(MaybeUser(user): MaybeUser, flashes: Flashes) -> Response {
    let template = WelcomeTemplate {
        title: "Welcome",
        flashes: flashes.0.clone(),
        user: user.as_ref().map(NavUser::from),
    };
    render_page(&template, &flashes)
}

/// Upload form plus the user's scripts. Admins see every script.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flashes: Flashes,
) -> Response {
    let scripts = if user.is_admin {
        state.db.scripts().list_all().await
    } else {
        state.db.scripts().list_for_user(user.id).await
    };

    let scripts = match scripts {
        Ok(scripts) => scripts,
        Err(e) => {
            error!("Failed to list scripts for {}: {}", user.email, e);
            return internal_error();
        }
    };

    let template = DashboardTemplate {
        title: "Dashboard",
        flashes: flashes.0.clone(),
        user: Some(NavUser::from(&user)),
        scripts: scripts.iter().map(ScriptRow::from).collect(),
        show_owner: user.is_admin,
    };
    render_page(&template, &flashes)
}

pub async fn not_found() -> Response {
    page_not_found()
}
