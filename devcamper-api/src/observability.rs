//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` wins over `service.log_level`. Development gets the human
/// formatter; every other environment logs JSON.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.service.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.service.environment.eq_ignore_ascii_case("development") {
        builder.try_init()
    } else {
        builder.json().try_init()
    };
    result.map_err(|e| Error::Internal(format!("Failed to initialize tracing: {e}")))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );

    Ok(())
}
