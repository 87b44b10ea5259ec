//! Session and flash-message cookies.
//!
//! The `session` cookie carries an opaque token resolved against the
//! `sessions` table. Flash messages ride in a short-lived `flash` cookie
//! that is cleared by the next page that displays them.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use super::handlers::internal_error;
use super::AppState;
use crate::models::User;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

/// Read one cookie from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a browser-session cookie.
pub fn set_cookie(name: &str, value: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value)
}

/// `Set-Cookie` value that expires a cookie.
pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", name)
}

/// Bootstrap alert category of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashCategory {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Info => "info",
            FlashCategory::Warning => "warning",
            FlashCategory::Danger => "danger",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(FlashCategory::Success),
            "info" => Some(FlashCategory::Info),
            "warning" => Some(FlashCategory::Warning),
            "danger" => Some(FlashCategory::Danger),
            _ => None,
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn new(category: FlashCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// CSS class for templates.
    pub fn css_class(&self) -> &'static str {
        self.category.as_str()
    }
}

/// Cookie form: `category:message` pairs joined by `&`, messages URL-encoded.
pub fn encode_flashes(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|f| format!("{}:{}", f.category.as_str(), urlencoding::encode(&f.message)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn decode_flashes(value: &str) -> Vec<Flash> {
    value
        .split('&')
        .filter_map(|entry| {
            let (category, message) = entry.split_once(':')?;
            let category = FlashCategory::parse(category)?;
            let message = urlencoding::decode(message).ok()?;
            Some(Flash::new(category, message.into_owned()))
        })
        .collect()
}

/// 303 redirect that leaves a flash message for the target page.
pub fn redirect_with_flash(location: &str, category: FlashCategory, message: &str) -> Response {
    let cookie = set_cookie(FLASH_COOKIE, &encode_flashes(&[Flash::new(category, message)]));
    ([(header::SET_COOKIE, cookie)], Redirect::to(location)).into_response()
}

/// Pending flash messages of the current request.
#[derive(Debug, Default)]
pub struct Flashes(pub Vec<Flash>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Flashes {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flashes(
            cookie_value(&parts.headers, FLASH_COOKIE)
                .map(|value| decode_flashes(&value))
                .unwrap_or_default(),
        ))
    }
}

/// Attach a cookie-clearing header when flashes were shown.
pub fn consume_flashes(mut response: Response, flashes: &Flashes) -> Response {
    if !flashes.0.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&clear_cookie(FLASH_COOKIE)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Session token from the request, if any.
pub fn session_token(parts: &Parts) -> Option<String> {
    cookie_value(&parts.headers, SESSION_COOKIE).filter(|token| !token.is_empty())
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<User>, Response> {
    let Some(token) = session_token(parts) else {
        return Ok(None);
    };

    state.auth.current_user(&token).await.map_err(|e| {
        error!("Session lookup failed: {}", e);
        internal_error()
    })
}

/// The logged-in user. Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(redirect_with_flash(
                "/login",
                FlashCategory::Info,
                "Please log in to access this page.",
            )),
        }
    }
}

/// The logged-in user, if there is one.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve_user(parts, state).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; flash=info:hi"),
        );
        assert_eq!(cookie_value(&headers, "session").as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "flash").as_deref(), Some("info:hi"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_flash_encoding() {
        let flashes = vec![
            Flash::new(FlashCategory::Danger, "Invalid email or password."),
            Flash::new(FlashCategory::Success, "50% done; a=b & c:d"),
        ];
        let encoded = encode_flashes(&flashes);
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains(';'));
        assert_eq!(decode_flashes(&encoded), flashes);
    }

    #[test]
    fn test_decode_ignores_garbage() {
        assert!(decode_flashes("").is_empty());
        assert!(decode_flashes("nonsense").is_empty());
        assert_eq!(
            decode_flashes("bogus:x&info:ok"),
            vec![Flash::new(FlashCategory::Info, "ok")]
        );
    }

    #[test]
    fn test_redirect_with_flash() {
        let response = redirect_with_flash("/login", FlashCategory::Info, "You have been logged out.");
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=info:You%20have%20been%20logged%20out."));
    }
}
