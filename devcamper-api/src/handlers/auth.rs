//! `/api/v1/auth`: registration, sessions and password management

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::API_PREFIX;
use crate::auth::{reset_digest, ResetToken};
use crate::error::{Error, Result};
use crate::extract::JsonBody;
use crate::middleware::{CurrentUser, RouteGuard};
use crate::models::{Repository, Role, User};
use crate::query::Filter;
use crate::responses::{logout_cookie, Success, TokenResponse};
use crate::state::AppState;
use crate::store::{new_document_id, Document};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Authentication routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let protect = || RouteGuard::protect(state.clone());
    let auth = |path: &str| format!("{API_PREFIX}/auth{path}");

    Router::new()
        .route(&auth("/register"), post(register))
        .route(&auth("/login"), post(login))
        .route(&auth("/logout"), get(logout))
        .route(&auth("/me"), protect().guard(get(me)))
        .route(&auth("/updatedetails"), protect().guard(put(update_details)))
        .route(&auth("/updatepassword"), protect().guard(put(update_password)))
        .route(&auth("/forgotpassword"), post(forgot_password))
        .route(&auth("/resetpassword/{resettoken}"), put(reset_password))
}

/// Registration body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Login body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Fields a user may change about themselves
#[derive(Debug, Deserialize)]
pub struct UpdateDetailsRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// Sign a token for `user` and set the session cookie
fn token_response(state: &AppState, user: &User) -> Result<TokenResponse> {
    let config = state.config();
    Ok(TokenResponse::new(
        state.tokens().issue(&user.id)?,
        config.jwt.cookie_expire_days,
        config.service.is_production(),
    ))
}

/// `POST /api/v1/auth/register`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<TokenResponse> {
    let role = body.role.unwrap_or_default();
    if role == Role::Admin {
        return Err(Error::ValidationError(
            "Role admin can not be chosen at registration".to_string(),
        ));
    }

    let user = User {
        id: new_document_id(),
        name: body.name,
        email: body.email.trim().to_lowercase(),
        role,
        password: state.passwords().hash(&body.password)?,
        reset_password_token: None,
        reset_password_expire: None,
        created_at: Utc::now(),
    };
    let user = Repository::<User>::new(state.store()).insert(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    token_response(&state, &user)
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<TokenResponse> {
    let (Some(email), Some(password)) = (
        body.email.filter(|e| !e.trim().is_empty()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(Error::BadRequest(
            "Please provide an email and password".to_string(),
        ));
    };

    let user = Repository::<User>::new(state.store())
        .find_one(Filter::new().eq("email", email.trim().to_lowercase()))
        .await?
        .ok_or_else(|| Error::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !state.passwords().verify(&password, &user.password)? {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(Error::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    token_response(&state, &user)
}

/// `GET /api/v1/auth/logout`
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = logout_cookie(state.config().service.is_production());
    ([(header::SET_COOKIE, cookie)], Success::empty())
}

/// `GET /api/v1/auth/me`
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Result<Success<Document>> {
    Ok(Success::new(user.public_document()?))
}

/// `PUT /api/v1/auth/updatedetails`
pub async fn update_details(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(body): JsonBody<UpdateDetailsRequest>,
) -> Result<Success<Document>> {
    let mut user = user;
    if let Some(name) = body.name {
        user.name = name;
    }
    if let Some(email) = body.email {
        user.email = email.trim().to_lowercase();
    }

    let saved = Repository::<User>::new(state.store()).save(&user).await?;
    Ok(Success::new(saved.public_document()?))
}

/// `PUT /api/v1/auth/updatepassword`
pub async fn update_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(body): JsonBody<UpdatePasswordRequest>,
) -> Result<TokenResponse> {
    if !state.passwords().verify(&body.current_password, &user.password)? {
        return Err(Error::Unauthorized("Password is incorrect".to_string()));
    }

    let mut user = user;
    user.password = state.passwords().hash(&body.new_password)?;
    let user = Repository::<User>::new(state.store()).save(&user).await?;
    token_response(&state, &user)
}

/// `POST /api/v1/auth/forgotpassword`
///
/// Stores a digest of a fresh reset token and hands the plain token to the
/// configured notifier. If delivery fails the token is cleared again.
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<ForgotPasswordRequest>,
) -> Result<Success<&'static str>> {
    let users = Repository::<User>::new(state.store());
    let mut user = users
        .find_one(Filter::new().eq("email", body.email.trim().to_lowercase()))
        .await?
        .ok_or_else(|| Error::NotFound("There is no user with that email".to_string()))?;

    let reset = ResetToken::generate(Duration::minutes(
        state.config().auth.reset_token_expire_mins,
    ));
    user.reset_password_token = Some(reset.digest.clone());
    user.reset_password_expire = Some(reset.expires_at);
    let mut user = users.save(&user).await?;

    let reset_url = format!(
        "{}/resetpassword/{}",
        public_base_url(&state, &headers),
        reset.token
    );
    if let Err(err) = state.notifier().send_reset(&user, &reset_url).await {
        tracing::error!(user_id = %user.id, error = %err, "reset delivery failed");
        user.reset_password_token = None;
        user.reset_password_expire = None;
        users.save(&user).await?;
        return Err(Error::Internal("Email could not be sent".to_string()));
    }

    Ok(Success::new("Email sent"))
}

/// `PUT /api/v1/auth/resetpassword/{resettoken}`
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<TokenResponse> {
    let users = Repository::<User>::new(state.store());
    let mut user = users
        .find_one(Filter::new().eq("resetPasswordToken", reset_digest(&token)))
        .await?
        .filter(|user| user.reset_password_expire.is_some_and(|at| at > Utc::now()))
        .ok_or_else(|| Error::BadRequest("Invalid token".to_string()))?;

    user.password = state.passwords().hash(&body.password)?;
    user.reset_password_token = None;
    user.reset_password_expire = None;
    let user = users.save(&user).await?;

    tracing::info!(user_id = %user.id, "password reset");
    token_response(&state, &user)
}

/// `{scheme}://{host}/api/v1/auth` as seen by the client
fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    let scheme = if state.config().security_headers.behind_tls {
        "https"
    } else {
        "http"
    };
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map_or_else(
            || format!("localhost:{}", state.config().service.port),
            str::to_string,
        );
    format!("{scheme}://{host}{API_PREFIX}/auth")
}
