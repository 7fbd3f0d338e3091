use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

use crate::models::subscription::SubscriptionInterval;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Named subscription defaults. These are the only fallbacks applied
/// when an order's subscription metadata is absent or unusable; no
/// component invents its own.
pub const DEFAULT_SUBSCRIPTION_FREQUENCY: u32 = 4;
pub const DEFAULT_SUBSCRIPTION_INTERVAL: SubscriptionInterval = SubscriptionInterval::Weeks;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_subscription_frequency() -> u32 {
    DEFAULT_SUBSCRIPTION_FREQUENCY
}

fn default_subscription_interval() -> SubscriptionInterval {
    DEFAULT_SUBSCRIPTION_INTERVAL
}

/// Connection settings for the external order/commerce backend.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OrderBackendConfig {
    /// Base URL of the backend REST API
    #[validate(url)]
    pub base_url: String,

    /// OAuth2 client-credentials id
    #[validate(length(min = 1))]
    pub client_id: String,

    /// OAuth2 client-credentials secret
    #[validate(length(min = 1))]
    pub client_secret: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Connection settings for the external payment gateway.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaymentGatewayConfig {
    /// Base URL of the gateway REST API
    #[validate(url)]
    pub base_url: String,

    /// Secret API key, sent as a bearer credential
    #[validate(length(min = 1))]
    pub secret_key: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Fallbacks for orders whose subscription metadata is incomplete.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionDefaults {
    #[serde(default = "default_subscription_interval")]
    pub interval: SubscriptionInterval,

    /// Recurrence frequency used when the order carries none.
    #[validate(range(min = 1))]
    #[serde(default = "default_subscription_frequency")]
    pub frequency: u32,
}

impl Default for SubscriptionDefaults {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SUBSCRIPTION_INTERVAL,
            frequency: DEFAULT_SUBSCRIPTION_FREQUENCY,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Public base URL used to build user-facing redirect targets
    #[validate(url)]
    pub public_base_url: String,

    /// Order/commerce backend connection
    #[validate]
    pub order_backend: OrderBackendConfig,

    /// Payment gateway connection
    #[validate]
    pub payment_gateway: PaymentGatewayConfig,

    /// Subscription metadata fallbacks
    #[validate]
    #[serde(default)]
    pub subscription: SubscriptionDefaults,

    /// Outbound subscription-event webhook target; absent disables delivery
    #[serde(default)]
    pub notification_webhook_url: Option<String>,

    /// HMAC secret for signing outbound webhook payloads
    #[serde(default)]
    pub notification_webhook_secret: Option<String>,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Load configuration from defaults, optional `config/{env}` files and
/// `APP__`-prefixed environment variables, in increasing precedence.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: backend credentials and the gateway secret key have no
    // defaults - they MUST come from a config file or the environment.
    let builder = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("public_base_url", "http://localhost:3000")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("checkout_api={},tower_http=debug", level);
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
