//! HTTP response builders
//!
//! Every success body carries `success: true`:
//!
//! - [`Success`]: 200 `{success, data}`
//! - [`Created`]: 201 `{success, data}`
//! - [`Listing`]: 200 `{success, count, data}` for unpaginated lists
//! - [`TokenResponse`]: 200 `{success, token}` plus the session cookie
//!
//! Paged lists use [`crate::query::PagedResult`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::middleware::TOKEN_COOKIE;

/// Seconds a logged-out cookie lingers
pub const LOGOUT_COOKIE_SECS: u64 = 10;

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

// ============================================================================
// 200 OK
// ============================================================================

/// HTTP 200 with `{success: true, data}`
#[derive(Debug)]
pub struct Success<T> {
    data: T,
}

impl<T> Success<T> {
    /// Wrap response data
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl Success<Map<String, Value>> {
    /// `{success: true, data: {}}`, the body of a delete
    pub fn empty() -> Self {
        Self { data: Map::new() }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(Envelope {
            success: true,
            data: self.data,
        })
        .into_response()
    }
}

// ============================================================================
// 201 Created
// ============================================================================

/// HTTP 201 with `{success: true, data}`
#[derive(Debug)]
pub struct Created<T> {
    data: T,
    location: Option<String>,
}

impl<T> Created<T> {
    /// Wrap the created resource
    pub fn new(data: T) -> Self {
        Self {
            data,
            location: None,
        }
    }

    /// Add a Location header pointing to the created resource
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            data: self.data,
        };
        let mut response = (StatusCode::CREATED, Json(body)).into_response();

        if let Some(location) = self.location {
            if let Ok(header_value) = HeaderValue::from_str(&location) {
                response.headers_mut().insert(header::LOCATION, header_value);
            }
        }

        response
    }
}

// ============================================================================
// Unpaginated lists
// ============================================================================

/// HTTP 200 with `{success: true, count, data}`
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    success: bool,
    count: usize,
    data: Vec<T>,
}

impl<T> Listing<T> {
    /// Wrap a full result set
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Listing<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

// ============================================================================
// Session tokens
// ============================================================================

/// `{success: true, token}` with a matching `token` cookie
#[derive(Debug)]
pub struct TokenResponse {
    token: String,
    max_age_secs: u64,
    secure: bool,
}

#[derive(Serialize)]
struct TokenBody<'a> {
    success: bool,
    token: &'a str,
}

impl TokenResponse {
    /// Issue `token` with a cookie lasting `cookie_expire_days`
    pub fn new(token: String, cookie_expire_days: u32, secure: bool) -> Self {
        Self {
            token,
            max_age_secs: u64::from(cookie_expire_days) * 24 * 60 * 60,
            secure,
        }
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        let cookie = session_cookie(&self.token, self.max_age_secs, self.secure);
        let body = TokenBody {
            success: true,
            token: &self.token,
        };
        let mut response = Json(body).into_response();
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        response
    }
}

/// Overwrite the session cookie with `none`, expiring shortly
pub fn logout_cookie(secure: bool) -> HeaderValue {
    let cookie = session_cookie("none", LOGOUT_COOKIE_SECS, secure);
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("token=none"))
}

fn session_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!("{TOKEN_COOKIE}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
