//! Application configuration loaded from environment variables.

use domain::{Currency, Money, ValidationError};
use lifecycle::LifecycleSettings;
use thiserror::Error;

/// Signing secret used by the in-memory gateway when no gateway credentials
/// are configured. Local runs and tests only.
pub const DEV_PAYMENT_SECRET: &str = "dev_payment_secret";

/// Razorpay REST API base URL.
pub const DEFAULT_PAYMENT_API_BASE: &str = "https://api.razorpay.com/v1";

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    pub api_base: String,
    pub currency: String,
    /// Largest order amount in major units.
    pub max_amount: i64,
}

impl PaymentConfig {
    /// Returns the gateway credentials if both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.key_id.as_deref(), self.key_secret.as_deref()) {
            (Some(id), Some(secret)) => Some((id, secret)),
            _ => None,
        }
    }

    /// Builds the lifecycle creation limits.
    pub fn lifecycle_settings(&self) -> Result<LifecycleSettings, ConfigError> {
        let max_amount =
            Money::checked_from_major(self.max_amount).ok_or_else(|| ConfigError::InvalidValue {
                key: "PAYMENT_MAX_AMOUNT",
                value: self.max_amount.to_string(),
            })?;
        Ok(LifecycleSettings {
            currency: Currency::new(&self.currency)?,
            max_amount,
            ..LifecycleSettings::default()
        })
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            key_secret: None,
            api_base: DEFAULT_PAYMENT_API_BASE.to_string(),
            currency: "INR".to_string(),
            max_amount: 100_000,
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset means in-memory storage
/// - `PAYMENT_KEY_ID` / `PAYMENT_KEY_SECRET`: gateway credentials; unset
///   means the in-memory gateway signing with [`DEV_PAYMENT_SECRET`]
/// - `PAYMENT_API_BASE`, `PAYMENT_CURRENCY` (`INR`), `PAYMENT_MAX_AMOUNT` (`100000`)
/// - `SEED_DEMO_DATA`: seed demo properties and tokens (default: `false`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub payment: PaymentConfig,
    pub seed_demo_data: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: v,
            })?,
            None => defaults.port,
        };

        let log_format = match var("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        let max_amount = match var("PAYMENT_MAX_AMOUNT") {
            Some(v) => match v.trim().parse::<i64>() {
                Ok(amount) if amount > 0 && Money::checked_from_major(amount).is_some() => amount,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PAYMENT_MAX_AMOUNT",
                        value: v,
                    });
                }
            },
            None => defaults.payment.max_amount,
        };

        let seed_demo_data = var("SEED_DEMO_DATA")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: var("DATABASE_URL"),
            payment: PaymentConfig {
                key_id: var("PAYMENT_KEY_ID"),
                key_secret: var("PAYMENT_KEY_SECRET"),
                api_base: var("PAYMENT_API_BASE").unwrap_or(defaults.payment.api_base),
                currency: var("PAYMENT_CURRENCY").unwrap_or(defaults.payment.currency),
                max_amount,
            },
            seed_demo_data,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            payment: PaymentConfig::default(),
            seed_demo_data: false,
        }
    }
}
