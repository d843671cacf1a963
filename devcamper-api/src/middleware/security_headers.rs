//! Helmet-style security headers via `SetResponseHeaderLayer`

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::SecurityHeadersConfig;

/// Apply the configured security headers to every response.
///
/// HSTS is only sent when the service sits behind TLS.
pub fn apply_security_headers(mut app: Router, config: &SecurityHeadersConfig) -> Router {
    if !config.enabled {
        return app;
    }

    if config.behind_tls && config.hsts {
        let mut value = format!("max-age={}", config.hsts_max_age_secs);
        if config.hsts_include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if let Ok(hv) = HeaderValue::from_str(&value) {
            app = app.layer(SetResponseHeaderLayer::overriding(
                header::STRICT_TRANSPORT_SECURITY,
                hv,
            ));
        }
    }

    let mut static_headers: Vec<(HeaderName, HeaderValue)> = Vec::new();
    if config.x_content_type_options {
        static_headers.push((header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")));
    }
    if config.x_xss_protection {
        static_headers.push((header::X_XSS_PROTECTION, HeaderValue::from_static("0")));
    }
    for (name, value) in [
        (header::X_FRAME_OPTIONS, &config.x_frame_options),
        (header::REFERRER_POLICY, &config.referrer_policy),
    ] {
        if value.is_empty() {
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(hv) => static_headers.push((name, hv)),
            Err(_) => tracing::warn!(header = %name, value = %value, "ignoring invalid header value"),
        }
    }

    for (name, value) in static_headers {
        app = app.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }
    app
}
