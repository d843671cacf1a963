//! Route guards: `protect` (any signed-in user) and `authorize` (listed roles)
//!
//! A guard is built once per route at startup and attached with
//! `axum::middleware::from_fn_with_state`. On success the loaded user is placed
//! in the request extensions as [`CurrentUser`].

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::{Error, Result};
use crate::models::{Repository, Role, User};
use crate::state::AppState;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// The authenticated user for this request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Read the session token from `Authorization: Bearer` or the `token` cookie
pub fn extract_token(headers: &HeaderMap) -> Result<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Ok(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("token="))
        .find(|token| !token.is_empty() && *token != "none")
        .map(str::to_string)
        .ok_or_else(|| Error::Unauthorized(NOT_AUTHORIZED.to_string()))
}

/// Authentication and role check for a route
#[derive(Clone)]
pub struct RouteGuard {
    state: AppState,
    roles: &'static [Role],
}

impl RouteGuard {
    /// Require a valid session
    pub fn protect(state: AppState) -> Self {
        Self { state, roles: &[] }
    }

    /// Require a valid session whose role is one of `roles`
    pub fn authorize(state: AppState, roles: &'static [Role]) -> Self {
        Self { state, roles }
    }

    /// Resolve the user for a set of request headers and check the role
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<User> {
        let token = extract_token(headers)?;
        let claims = self.state.tokens().verify(&token)?;
        let user = Repository::<User>::new(self.state.store())
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| Error::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        if !self.roles.is_empty() && !self.roles.contains(&user.role) {
            return Err(Error::Forbidden(format!(
                "User role {} is not authorized to access this route",
                user.role
            )));
        }
        Ok(user)
    }

    /// Run this guard in front of every handler on `route`
    pub fn guard(self, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
        route.route_layer(from_fn_with_state(self, Self::middleware))
    }

    /// Middleware entry point
    pub async fn middleware(
        State(guard): State<Self>,
        mut request: Request<Body>,
        next: Next,
    ) -> Result<Response> {
        let user = guard.authenticate(request.headers()).await?;
        tracing::debug!(user_id = %user.id, role = %user.role, "request authenticated");
        request.extensions_mut().insert(CurrentUser(user));
        Ok(next.run(request).await)
    }
}
