//! Policy configuration.
//!
//! ```rust,no_run
//! use allowance_manager::config::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create("sia_allowance_manager.toml").await?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

mod file;
mod validator;

pub use file::{
    API_PASSWORD_ENV, DEFAULT_CONFIG_FILE, DEFAULT_CONFIG_TEMPLATE, default_password_file,
};

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::currency::Currency;
use crate::price::{DEFAULT_TICKER_PAIR, DEFAULT_TICKER_URL};

pub const DEFAULT_API_ADDRESS: &str = "127.0.0.1:9980";

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// Malformed TOML
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Multiple validation errors
    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: ")?;
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Whether the storage and collateral ceilings already account for redundancy.
///
/// | basis             | host limit        | cost per TB of user data |
/// |-------------------|-------------------|--------------------------|
/// | `conservative`    | ceiling / r       | ceiling × r              |
/// | `per_host`        | ceiling           | ceiling × r              |
/// | `per_stored_data` | ceiling / r       | ceiling                  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeilingBasis {
    #[default]
    Conservative,
    PerHost,
    PerStoredData,
}

impl CeilingBasis {
    /// Divisor applied to the storage and collateral ceilings before
    /// comparing against a single host.
    pub fn host_divisor(self, redundancy: f64) -> f64 {
        match self {
            Self::Conservative | Self::PerStoredData => redundancy,
            Self::PerHost => 1.0,
        }
    }

    /// Multiplier turning the storage ceiling into the cost of one TB of
    /// user data.
    pub fn cost_multiplier(self, redundancy: f64) -> f64 {
        match self {
            Self::Conservative | Self::PerHost => redundancy,
            Self::PerStoredData => 1.0,
        }
    }
}

/// Dead band of the allowance controller, as fractions of current funds.
///
/// The three values shape one band and are configured together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HysteresisPolicy {
    /// Unallocated share at or below which funds are raised.
    pub low: Decimal,
    /// Unallocated share at or above which funds are lowered.
    pub high: Decimal,
    /// Step applied to funds on each adjustment.
    pub margin: Decimal,
}

impl Default for HysteresisPolicy {
    fn default() -> Self {
        Self {
            low: dec!(0.125),
            high: dec!(0.5),
            margin: dec!(0.2),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_secret")]
    pub sia_api_password: SecretString,
    pub sia_api_address: String,
    pub ticker_url: String,
    pub ticker_pair: String,

    // Fiat ceilings. Storage and collateral are per host, interpreted
    // according to `ceiling_basis`.
    pub max_storage_price_tb_month: Decimal,
    pub max_download_price_tb: Decimal,
    pub max_upload_price_tb: Decimal,
    pub max_contract_formation_price: Decimal,
    pub max_collateral_tb_month: Decimal,
    pub ceiling_basis: CeilingBasis,

    pub redundancy: Decimal,
    pub hosts: u64,
    /// Blocks.
    pub contract_length: u64,
    /// Blocks.
    pub renew_window: u64,

    /// Coins. Funds below this are raised to it before the controller runs.
    pub min_funds: Decimal,
    pub hysteresis: HysteresisPolicy,

    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sia_api_password: SecretString::from(""),
            sia_api_address: DEFAULT_API_ADDRESS.to_string(),
            ticker_url: DEFAULT_TICKER_URL.to_string(),
            ticker_pair: DEFAULT_TICKER_PAIR.to_string(),
            max_storage_price_tb_month: dec!(1.80),
            max_download_price_tb: dec!(2.50),
            max_upload_price_tb: dec!(2.00),
            max_contract_formation_price: dec!(0.10),
            max_collateral_tb_month: dec!(8.00),
            ceiling_basis: CeilingBasis::default(),
            redundancy: dec!(3.00),
            hosts: 50,
            contract_length: 12960,
            renew_window: 4320,
            min_funds: dec!(1000),
            hysteresis: HysteresisPolicy::default(),
            request_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn redundancy_f64(&self) -> f64 {
        decimal_to_f64(self.redundancy)
    }

    pub fn min_funds(&self) -> Currency {
        Currency::from_coins_decimal(self.min_funds).unwrap_or(Currency::ZERO)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL of the node API, accepting a bare `host:port`.
    pub fn api_base_url(&self) -> String {
        if self.sia_api_address.contains("://") {
            self.sia_api_address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.sia_api_address.trim_end_matches('/'))
        }
    }
}

pub(crate) fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
