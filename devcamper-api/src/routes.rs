//! Application router

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::services::ServeDir;

use crate::{
    handlers::{auth, bootcamps, courses, reviews, users},
    health::health,
    middleware::{apply_security_headers, RateLimit},
    state::AppState,
};

/// Path uploaded photos are served under
pub const UPLOADS_PATH: &str = "/uploads";

/// Build the full router: API resources, health, static photos, rate limiting
/// and security headers
///
/// Transport middleware (CORS, compression, timeouts, tracing) is added by
/// [`Server::serve`](crate::server::Server::serve).
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .merge(bootcamps::routes(&state))
        .merge(courses::routes(&state))
        .merge(reviews::routes(&state))
        .merge(users::routes(&state))
        .merge(auth::routes(&state))
        .nest_service(UPLOADS_PATH, ServeDir::new(state.photos().dir()));

    if let Some(rate_limit) = state.rate_limit() {
        app = app.layer(from_fn_with_state(rate_limit.clone(), RateLimit::middleware));
    }

    let security_headers = state.config().security_headers.clone();
    apply_security_headers(app.with_state(state), &security_headers)
}
