use std::collections::HashMap;
use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_GATEWAY_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_READ_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_PAGE_SIZE: u64 = 10;
const DEFAULT_CURRENCY: &str = "USD";

/// Backend gateway configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    /// Base URL of the storefront backend API
    #[serde(default = "default_gateway_base_url")]
    #[validate(custom = "validate_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    #[validate(custom = "validate_nonzero_u64")]
    pub timeout_secs: u64,

    /// Attempts per read request, including the first
    #[serde(default = "default_max_read_retries")]
    pub max_read_retries: u32,

    /// Base backoff between read retries in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            timeout_secs: default_gateway_timeout_secs(),
            max_read_retries: default_max_read_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Per-provider configuration, keyed by provider name ("card", "wallet")
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// Whether the provider is offered at checkout
    #[serde(default)]
    pub enabled: bool,

    /// Publishable key handed to the payment form, when the provider needs one
    #[serde(default)]
    pub publishable_key: Option<String>,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Currency code used for order amounts
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub default_currency: String,

    /// Page size for order history requests
    #[serde(default = "default_page_size")]
    #[validate(custom = "validate_page_size")]
    pub default_page_size: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Backend gateway settings
    #[serde(default)]
    #[validate]
    pub gateway: GatewaySettings,

    /// Payment providers offered at checkout
    #[serde(default = "default_providers")]
    pub providers: HashMap<String, ProviderSettings>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            default_currency: default_currency(),
            default_page_size: default_page_size(),
            event_channel_capacity: default_event_channel_capacity(),
            gateway: GatewaySettings::default(),
            providers: default_providers(),
        }
    }
}

impl CheckoutConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum CheckoutConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_gateway_base_url() -> String {
    DEFAULT_GATEWAY_BASE_URL.to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_SECS
}

fn default_max_read_retries() -> u32 {
    DEFAULT_MAX_READ_RETRIES
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Card and wallet are both presented out of the box; wallet has no
/// working adapter yet and selecting it fails as unsupported.
fn default_providers() -> HashMap<String, ProviderSettings> {
    let mut providers = HashMap::new();
    providers.insert(
        "card".to_string(),
        ProviderSettings {
            enabled: true,
            publishable_key: None,
        },
    );
    providers.insert(
        "wallet".to_string(),
        ProviderSettings {
            enabled: true,
            publishable_key: None,
        },
    );
    providers
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("default_currency");
        err.message = Some("Currency must be a three-letter uppercase code".into());
        Err(err)
    }
}

// Number-typed fields reach custom validators by value.
fn validate_page_size(size: u64) -> Result<(), ValidationError> {
    if (1..=100).contains(&size) {
        Ok(())
    } else {
        let mut err = ValidationError::new("default_page_size");
        err.message = Some("default_page_size must be between 1 and 100".into());
        Err(err)
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_nonzero_u64(value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        let mut err = ValidationError::new("nonzero");
        err.message = Some("Must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_base_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("base_url");
            err.message = Some("Gateway base URL must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("checkout_core={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (CHECKOUT_*)
pub fn load_config() -> Result<CheckoutConfig, CheckoutConfigError> {
    // Support both RUN_ENV and CHECKOUT_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("CHECKOUT_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("CHECKOUT").separator("__"))
        .build()?;

    let checkout_config: CheckoutConfig = config.try_deserialize()?;

    checkout_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        CheckoutConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(checkout_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = CheckoutConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.is_development());
        assert!(!cfg.is_production());
    }

    #[test]
    fn default_providers_offer_card_and_wallet() {
        let cfg = CheckoutConfig::default();
        assert!(cfg.providers.get("card").map(|p| p.enabled).unwrap_or(false));
        assert!(cfg
            .providers
            .get("wallet")
            .map(|p| p.enabled)
            .unwrap_or(false));
    }

    #[test]
    fn invalid_log_level_fails_validation() {
        let mut cfg = CheckoutConfig::default();
        cfg.log_level = "verbose".into();

        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("log_level"));
    }

    #[test]
    fn invalid_currency_fails_validation() {
        let mut cfg = CheckoutConfig::default();
        cfg.default_currency = "usd".into();
        assert!(cfg.validate().is_err());

        cfg.default_currency = "DOLLARS".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_page_size_fails_validation() {
        let mut cfg = CheckoutConfig::default();
        cfg.default_page_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn numeric_validators_enforce_their_bounds() {
        assert!(validate_page_size(1).is_ok());
        assert!(validate_page_size(100).is_ok());
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(101).is_err());

        assert!(validate_event_channel_capacity(1).is_ok());
        assert!(validate_event_channel_capacity(0).is_err());

        assert!(validate_nonzero_u64(5).is_ok());
        assert!(validate_nonzero_u64(0).is_err());
    }

    #[test]
    fn gateway_base_url_must_be_http() {
        let mut cfg = CheckoutConfig::default();
        cfg.gateway.base_url = "not a url".into();
        assert!(cfg.validate().is_err());

        cfg.gateway.base_url = "ftp://example.com".into();
        assert!(cfg.validate().is_err());

        cfg.gateway.base_url = "https://api.example.com/v1".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_gateway_timeout_fails_validation() {
        let mut cfg = CheckoutConfig::default();
        cfg.gateway.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }
}
