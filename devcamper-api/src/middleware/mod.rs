//! HTTP middleware: route guards, rate limiting, security headers and request tracking

mod guard;
mod rate_limit;
mod request_tracking;
mod security_headers;

pub use guard::{extract_token, CurrentUser, RouteGuard, TOKEN_COOKIE};
pub use rate_limit::{client_key, RateLimit};
pub use request_tracking::{
    request_id_layer, request_id_propagation_layer, sensitive_headers_layer, SENSITIVE_HEADERS,
};
pub use security_headers::apply_security_headers;
