//! Request id generation, propagation and sensitive header masking

use axum::http::HeaderName;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::ids::MakeTypedRequestId;

/// Headers masked in request logs
pub const SENSITIVE_HEADERS: [HeaderName; 3] = [
    axum::http::header::AUTHORIZATION,
    axum::http::header::COOKIE,
    axum::http::header::SET_COOKIE,
];

/// Stamp requests with a `req_…` id under `header`
pub fn request_id_layer(header: HeaderName) -> SetRequestIdLayer<MakeTypedRequestId> {
    SetRequestIdLayer::new(header, MakeTypedRequestId)
}

/// Copy the request id onto the response
pub fn request_id_propagation_layer(header: HeaderName) -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(header)
}

/// Mark credentials as sensitive so traces print them redacted
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(SENSITIVE_HEADERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_request_id_round_trip() {
        let header = HeaderName::from_static("x-request-id");
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(request_id_propagation_layer(header.clone()))
            .layer(request_id_layer(header.clone()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers()[&header].to_str().unwrap();
        assert!(id.starts_with("req_"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "caller-supplied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[&header], "caller-supplied");
    }
}
