//! # devcamper-api
//!
//! REST API for a directory of coding bootcamps: bootcamps, their courses and
//! reviews, users, and JWT authentication, over a pluggable document store.
//!
//! ## Features
//!
//! - **Advanced results**: `select`, `sort`, `page`, `limit` and
//!   `field[gt|gte|lt|lte|in]=value` filters on every list endpoint
//! - **Radius search**: bootcamps within a distance of a geocoded zipcode
//! - **Route guards**: `protect` and `authorize(roles)` attached per route at startup
//! - **Middleware stack**: rate limiting, security headers, request ids, panic recovery
//! - **Graceful shutdown**: SIGTERM and SIGINT
//!
//! ## Example
//!
//! ```rust,no_run
//! use devcamper_api::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder().config(config.clone()).build()?;
//!     let app = router(state);
//!
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod geo;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod query;
pub mod responses;
pub mod routes;
pub mod seed;
pub mod server;
pub mod state;
pub mod store;
pub mod uploads;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::geo::{GeoLocation, Geocoder, StaticGeocoder};
    pub use crate::observability::init_tracing;
    pub use crate::routes::router;
    pub use crate::seed::seed_from_dir;
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder};
    pub use crate::store::{DocumentStore, MemoryStore};
}
