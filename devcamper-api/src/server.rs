//! HTTP server with graceful shutdown

use axum::{http::HeaderName, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    error::{Error, Result},
    middleware::{request_id_layer, request_id_propagation_layer, sensitive_headers_layer},
};

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wrap `app` in the transport middleware stack
    ///
    /// Layers are listed outermost first: CORS, compression, timeout, body
    /// limit, tracing, sensitive headers, request id, panic recovery.
    pub fn layers(&self, app: Router) -> Result<Router> {
        let middleware = &self.config.middleware;
        let tracking = &middleware.request_tracking;
        let body_limit = middleware.body_limit_mb * 1024 * 1024;

        let mut app = app;

        if middleware.catch_panic {
            app = app.layer(CatchPanicLayer::new());
        }

        if tracking.request_id_enabled {
            let header = HeaderName::try_from(tracking.request_id_header.as_str()).map_err(|e| {
                Error::Internal(format!(
                    "Invalid request id header '{}': {e}",
                    tracking.request_id_header
                ))
            })?;
            if tracking.propagate_headers {
                app = app.layer(request_id_propagation_layer(header.clone()));
            }
            app = app.layer(request_id_layer(header));
        }

        if tracking.mask_sensitive_headers {
            app = app.layer(sensitive_headers_layer());
        }

        app = app
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                self.config.service.timeout(),
            ));

        if middleware.compression {
            app = app.layer(CompressionLayer::new());
        }

        if let Some(cors) = self.build_cors_layer() {
            app = app.layer(cors);
        }

        Ok(app)
    }

    /// Run the server with the given router
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!(
            "Starting {} on {} ({})",
            self.config.service.name,
            addr,
            self.config.service.environment
        );
        self.log_middleware_config();

        let app = self.layers(app)?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        // ConnectInfo feeds the per-client rate limiter
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Log middleware configuration for debugging
    fn log_middleware_config(&self) {
        let middleware = &self.config.middleware;
        let tracking = &middleware.request_tracking;

        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: {}", middleware.catch_panic);
        tracing::info!(
            "  - Request ID tracking: {} ({})",
            tracking.request_id_enabled,
            tracking.request_id_header
        );
        tracing::info!(
            "  - Sensitive header masking: {}",
            tracking.mask_sensitive_headers
        );
        tracing::info!("  - Request body limit: {} MB", middleware.body_limit_mb);
        tracing::info!("  - Compression: {}", middleware.compression);
        tracing::info!("  - CORS mode: {}", middleware.cors_mode);
        tracing::info!(
            "  - Request timeout: {} seconds",
            self.config.service.timeout_secs
        );

        let rate_limit = &self.config.rate_limit;
        if rate_limit.enabled {
            tracing::info!(
                "  - Rate limiting: {} req / {} sec",
                rate_limit.requests_per_period,
                rate_limit.period_secs
            );
        } else {
            tracing::info!("  - Rate limiting: disabled");
        }
        tracing::info!(
            "  - Security headers: {} (HSTS: {})",
            self.config.security_headers.enabled,
            self.config.security_headers.behind_tls && self.config.security_headers.hsts
        );
    }

    /// Build CORS layer based on configuration; `None` when disabled
    fn build_cors_layer(&self) -> Option<CorsLayer> {
        match self.config.middleware.cors_mode.as_str() {
            "permissive" => {
                tracing::debug!("Enabling permissive CORS");
                Some(CorsLayer::permissive())
            }
            "restrictive" => {
                tracing::debug!("Enabling restrictive CORS (default deny)");
                Some(CorsLayer::new())
            }
            "disabled" => {
                tracing::debug!("CORS disabled");
                None
            }
            _ => {
                tracing::warn!(
                    "Unknown CORS mode: {}, defaulting to permissive",
                    self.config.middleware.cors_mode
                );
                Some(CorsLayer::permissive())
            }
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[test]
    fn test_server_creation() {
        let config = Config::default();
        let server = Server::new(config.clone());
        assert_eq!(server.config().service.port, config.service.port);
    }

    #[tokio::test]
    async fn test_layers_stamp_request_id() {
        let server = Server::new(Config::default());
        let app = server
            .layers(Router::new().route("/", get(|| async { "ok" })))
            .unwrap();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers()["x-request-id"]
            .to_str()
            .unwrap()
            .starts_with("req_"));
    }

    #[test]
    fn test_invalid_request_id_header_rejected() {
        let mut config = Config::default();
        config.middleware.request_tracking.request_id_header = "bad header".into();
        assert!(Server::new(config).layers(Router::new()).is_err());
    }
}
