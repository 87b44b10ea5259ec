//! Signup, login and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::error;

use super::super::session::{
    clear_cookie, cookie_value, encode_flashes, redirect_with_flash, set_cookie, CurrentUser,
    Flash, FlashCategory, Flashes, MaybeUser, FLASH_COOKIE, SESSION_COOKIE,
};
use super::super::template_structs::{LoginTemplate, NavUser, SignupTemplate};
use super::super::AppState;
use super::{internal_error, render_page};
use crate::auth::AuthError;

/// Login and signup form fields. Missing fields arrive as empty strings.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn signup_form(MaybeUser(user): MaybeUser, flashes: Flashes) -> Response {
    let template = SignupTemplate {
        title: "Sign Up",
        flashes: flashes.0.clone(),
        user: user.as_ref().map(NavUser::from),
    };
    render_page(&template, &flashes)
}

pub async fn signup(State(state): State<AppState>, Form(form): Form<Credentials>) -> Response {
    match state.auth.signup(&form.email, &form.password).await {
        Ok(_) => redirect_with_flash(
            "/login",
            FlashCategory::Success,
            "Account created successfully! Please login.",
        ),
        Err(e @ AuthError::MissingCredentials) => {
            redirect_with_flash("/signup", FlashCategory::Danger, &e.to_string())
        }
        Err(e @ AuthError::UserExists) => {
            redirect_with_flash("/login", FlashCategory::Warning, &e.to_string())
        }
        Err(e) => {
            error!("Signup failed: {}", e);
            internal_error()
        }
    }
}

pub async fn login_form(MaybeUser(user): MaybeUser, flashes: Flashes) -> Response {
    let template = LoginTemplate {
        title: "Login",
        flashes: flashes.0.clone(),
        user: user.as_ref().map(NavUser::from),
    };
    render_page(&template, &flashes)
}

pub async fn login(State(state): State<AppState>, Form(form): Form<Credentials>) -> Response {
    match state.auth.login(&form.email, &form.password).await {
        Ok((_, token)) => {
            let flash = encode_flashes(&[Flash::new(
                FlashCategory::Success,
                "Logged in successfully!",
            )]);
            (
                AppendHeaders([
                    (header::SET_COOKIE, set_cookie(SESSION_COOKIE, &token)),
                    (header::SET_COOKIE, set_cookie(FLASH_COOKIE, &flash)),
                ]),
                Redirect::to("/dashboard"),
            )
                .into_response()
        }
        Err(e @ AuthError::InvalidCredentials) => {
            redirect_with_flash("/login", FlashCategory::Danger, &e.to_string())
        }
        Err(e) => {
            error!("Login failed: {}", e);
            internal_error()
        }
    }
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Response {
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        if let Err(e) = state.auth.logout(&token).await {
            error!("Failed to delete session for {}: {}", user.email, e);
            return internal_error();
        }
    }

    let flash = encode_flashes(&[Flash::new(FlashCategory::Info, "You have been logged out.")]);
    (
        AppendHeaders([
            (header::SET_COOKIE, clear_cookie(SESSION_COOKIE)),
            (header::SET_COOKIE, set_cookie(FLASH_COOKIE, &flash)),
        ]),
        Redirect::to("/login"),
    )
        .into_response()
}
