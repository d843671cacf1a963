//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    auth::{LogNotifier, PasswordHasher, ResetNotifier, TokenIssuer},
    config::Config,
    error::Result,
    geo::{self, Geocoder},
    middleware::RateLimit,
    models::{BOOTCAMPS, REVIEWS, USERS},
    store::{DocumentStore, MemoryStore},
    uploads::PhotoStorage,
};

/// Application state shared across handlers
///
/// Every field is behind an `Arc` or cheap to clone, so the state is cloned
/// into each route guard and handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    geocoder: Arc<dyn Geocoder>,
    notifier: Arc<dyn ResetNotifier>,
    tokens: TokenIssuer,
    passwords: PasswordHasher,
    photos: PhotoStorage,
    rate_limit: Option<RateLimit>,
}

impl AppState {
    /// Create a new builder for AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Document store shared by every request
    pub fn store(&self) -> &dyn DocumentStore {
        &*self.store
    }

    /// Geocoding provider
    pub fn geocoder(&self) -> &dyn Geocoder {
        &*self.geocoder
    }

    /// Password reset delivery
    pub fn notifier(&self) -> &dyn ResetNotifier {
        &*self.notifier
    }

    /// JWT signing and verification
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Argon2 password hashing
    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    /// Photo upload storage
    pub fn photos(&self) -> &PhotoStorage {
        &self.photos
    }

    /// Per-client rate limiter, when enabled
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }
}

/// The in-memory store with the unique indexes every collection needs
pub fn default_store() -> MemoryStore {
    MemoryStore::new()
        .with_unique_index(BOOTCAMPS, &["name"])
        .with_unique_index(USERS, &["email"])
        .with_unique_index(REVIEWS, &["bootcamp", "user"])
}

/// Builder for AppState
///
/// Anything not supplied explicitly is built from the configuration: the
/// in-memory store, the configured geocoder and the logging reset notifier.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn DocumentStore>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    notifier: Option<Arc<dyn ResetNotifier>>,
}

impl AppStateBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a specific document store
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a specific geocoder instead of the configured provider
    pub fn geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Use a specific reset notifier
    pub fn notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the AppState
    pub fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let geocoder = match self.geocoder {
            Some(geocoder) => geocoder,
            None => geo::from_config(&config.geocoder)?,
        };
        let rate_limit = if config.rate_limit.enabled {
            Some(RateLimit::new(&config.rate_limit)?)
        } else {
            None
        };

        if config.jwt.secret == Config::default().jwt.secret && config.service.is_production() {
            tracing::warn!("jwt.secret is the built-in default; set DEVCAMPER_JWT__SECRET");
        }

        Ok(AppState {
            store: self.store.unwrap_or_else(|| Arc::new(default_store())),
            geocoder,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            tokens: TokenIssuer::new(&config.jwt),
            passwords: PasswordHasher::new(&config.auth)?,
            photos: PhotoStorage::new(&config.uploads),
            rate_limit,
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::Document;
    use serde_json::json;

    #[test]
    fn test_state_builder_defaults() {
        let state = AppState::builder().build().unwrap();
        assert_eq!(state.config().service.name, "devcamper-api");
        assert!(state.rate_limit().is_some());
    }

    #[test]
    fn test_rate_limit_disabled() {
        let mut config = Config::default();
        config.rate_limit.enabled = false;
        let state = AppState::builder().config(config).build().unwrap();
        assert!(state.rate_limit().is_none());
    }

    #[tokio::test]
    async fn test_default_store_enforces_unique_email() {
        let store = default_store();
        let user = |email: &str| -> Document {
            match json!({"name": "x", "email": email}) {
                serde_json::Value::Object(map) => map,
                _ => unreachable!(),
            }
        };
        store.insert(USERS, user("a@b.io")).await.unwrap();
        let err: Error = store.insert(USERS, user("a@b.io")).await.unwrap_err().into();
        assert!(matches!(err, Error::Duplicate(_)));
    }
}
