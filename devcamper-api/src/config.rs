//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: DEVCAMPER_, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/devcamper/config.toml
//! 4. System directory: /etc/devcamper/config.toml
//! 5. Default values
//!
//! `DEVCAMPER_JWT__SECRET=...` sets `jwt.secret`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

const ENV_PREFIX: &str = "DEVCAMPER_";
const APP_DIR: &str = "devcamper";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Security response headers
    #[serde(default)]
    pub security_headers: SecurityHeadersConfig,

    /// Photo upload configuration
    #[serde(default)]
    pub uploads: UploadsConfig,

    /// Geocoding provider configuration
    #[serde(default)]
    pub geocoder: GeocoderConfig,

    /// Document store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Password and reset token configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (development, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServiceConfig {
    /// Whether the service runs in production mode
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret used to sign HS256 tokens
    pub secret: String,

    /// Token lifetime in days
    #[serde(default = "default_expire_days")]
    pub expire_days: u32,

    /// Lifetime of the `token` cookie in days
    #[serde(default = "default_expire_days")]
    pub cookie_expire_days: u32,

    /// Issuer written to and required on tokens
    #[serde(default)]
    pub issuer: Option<String>,
}

/// Rate limiting configuration (governor, keyed by client IP)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable the limiter
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per period
    #[serde(default = "default_rate_limit_requests")]
    pub requests_per_period: u32,

    /// Period length in seconds
    #[serde(default = "default_rate_limit_period_secs")]
    pub period_secs: u64,

    /// Burst size; defaults to `requests_per_period`
    #[serde(default)]
    pub burst: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_period: default_rate_limit_requests(),
            period_secs: default_rate_limit_period_secs(),
            burst: None,
        }
    }
}

impl RateLimitConfig {
    /// Get the period as Duration
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request tracking configuration (request IDs, header propagation)
    #[serde(default)]
    pub request_tracking: RequestTrackingConfig,

    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: permissive, restrictive, disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            request_tracking: RequestTrackingConfig::default(),
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
        }
    }
}

/// Request tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTrackingConfig {
    /// Enable request ID generation
    #[serde(default = "default_true")]
    pub request_id_enabled: bool,

    /// Request ID header name
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,

    /// Enable header propagation
    #[serde(default = "default_true")]
    pub propagate_headers: bool,

    /// Enable sensitive header masking in logs
    #[serde(default = "default_true")]
    pub mask_sensitive_headers: bool,
}

impl Default for RequestTrackingConfig {
    fn default() -> Self {
        Self {
            request_id_enabled: true,
            request_id_header: default_request_id_header(),
            propagate_headers: true,
            mask_sensitive_headers: true,
        }
    }
}

/// Security response headers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityHeadersConfig {
    /// Apply any security headers at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Send Strict-Transport-Security (only behind TLS)
    #[serde(default = "default_true")]
    pub hsts: bool,

    /// HSTS max-age
    #[serde(default = "default_hsts_max_age")]
    pub hsts_max_age_secs: u64,

    /// HSTS includeSubDomains
    #[serde(default = "default_true")]
    pub hsts_include_subdomains: bool,

    /// X-Content-Type-Options: nosniff
    #[serde(default = "default_true")]
    pub x_content_type_options: bool,

    /// X-Frame-Options value; empty disables
    #[serde(default = "default_frame_options")]
    pub x_frame_options: String,

    /// X-XSS-Protection: 0
    #[serde(default = "default_true")]
    pub x_xss_protection: bool,

    /// Referrer-Policy value; empty disables
    #[serde(default = "default_referrer_policy")]
    pub referrer_policy: String,

    /// The service sits behind a TLS terminating proxy
    #[serde(default)]
    pub behind_tls: bool,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hsts: true,
            hsts_max_age_secs: default_hsts_max_age(),
            hsts_include_subdomains: true,
            x_content_type_options: true,
            x_frame_options: default_frame_options(),
            x_xss_protection: true,
            referrer_policy: default_referrer_policy(),
            behind_tls: false,
        }
    }
}

/// Photo upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    /// Directory photos are written to and served from
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,

    /// Largest accepted photo in bytes
    #[serde(default = "default_max_file_upload")]
    pub max_file_upload_bytes: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_file_upload_bytes: default_max_file_upload(),
        }
    }
}

/// Geocoding provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderProvider {
    /// MapQuest geocoding API
    Mapquest,
    /// Fixed lookup table from configuration
    Static,
}

/// Geocoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Which provider to use
    #[serde(default = "default_geocoder_provider")]
    pub provider: GeocoderProvider,

    /// Provider API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override for the provider endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,

    /// Static table: query text (address or zipcode) to `[latitude, longitude]`
    #[serde(default)]
    pub entries: HashMap<String, [f64; 2]>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            provider: default_geocoder_provider(),
            api_key: None,
            base_url: None,
            timeout_secs: default_geocoder_timeout(),
            entries: HashMap::new(),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory of JSON fixtures loaded at startup
    #[serde(default)]
    pub seed_dir: Option<PathBuf>,
}

/// Password hashing and reset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum password length
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Minutes a password reset token stays valid
    #[serde(default = "default_reset_token_expire_mins")]
    pub reset_token_expire_mins: i64,

    /// Argon2 memory cost in KiB
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iterations
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            reset_token_expire_mins: default_reset_token_expire_mins(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_expire_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_rate_limit_requests() -> u32 {
    100
}

fn default_rate_limit_period_secs() -> u64 {
    600
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

fn default_hsts_max_age() -> u64 {
    15_552_000
}

fn default_frame_options() -> String {
    "SAMEORIGIN".to_string()
}

fn default_referrer_policy() -> String {
    "no-referrer".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./public/uploads")
}

fn default_max_file_upload() -> u64 {
    1_000_000
}

fn default_geocoder_provider() -> GeocoderProvider {
    GeocoderProvider::Static
}

fn default_geocoder_timeout() -> u64 {
    10
}

fn default_min_password_length() -> usize {
    6
}

fn default_reset_token_expire_mins() -> i64 {
    10
}

fn default_argon2_memory_kib() -> u32 {
    19_456
}

fn default_argon2_iterations() -> u32 {
    2
}

fn default_argon2_parallelism() -> u32 {
    1
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Config files are merged lowest priority first, then environment
    /// variables (DEVCAMPER_ prefix) override everything.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the search path. Environment variables still override.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Config file locations in priority order (highest first)
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_DIR);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(APP_DIR).join("config.toml"));

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "devcamper-api".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            jwt: JwtConfig {
                secret: "change-me".to_string(),
                expire_days: default_expire_days(),
                cookie_expire_days: default_expire_days(),
                issuer: None,
            },
            rate_limit: RateLimitConfig::default(),
            middleware: MiddlewareConfig::default(),
            security_headers: SecurityHeadersConfig::default(),
            uploads: UploadsConfig::default(),
            geocoder: GeocoderConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}
