//! # allowance-manager
//!
//! Periodic budget controller for a Sia renter.
//!
//! Each run converts the siacoin price into fiat, whitelists the hosts whose
//! prices fit under fiat ceilings, and nudges the renter allowance so that a
//! target share of funds stays unallocated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use allowance_manager::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), allowance_manager::Error> {
//!     let config = Config::load_or_create("sia_allowance_manager.toml").await?;
//!     let report = allowance_manager::run_once(config, false).await?;
//!     println!("{} hosts admitted, {}", report.filter.admitted.len(), report.decision.label());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom adapters
//!
//! ```rust,no_run
//! use allowance_manager::{AllowanceManager, KrakenTicker, SiaClient};
//! use allowance_manager::config::Config;
//!
//! # async fn example() -> Result<(), allowance_manager::Error> {
//! let config = Config::default();
//! let ticker = KrakenTicker::new("https://api.kraken.com/0/public/Ticker", "SCUSD")?;
//! let node = SiaClient::from_config(&config)?;
//! let report = AllowanceManager::new(config, ticker, node)
//!     .dry_run(true)
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod allowance;
pub mod config;
pub mod currency;
pub mod filter;
pub mod manager;
pub mod price;
pub mod renter;

pub use allowance::{AllowanceController, AllowanceUpdate, Assessment, Decision, UsageTargets};
pub use config::{CeilingBasis, Config, ConfigError, HysteresisPolicy};
pub use currency::{Currency, format_bytes};
pub use filter::{FilterOutcome, HostFilter, PriceDimension, PriceLimits, Rejection};
pub use manager::{AllowanceManager, RunReport};
pub use price::{ExchangeRate, KrakenTicker, PriceOracle};
pub use renter::{Host, HostPublicKey, RenterState, SiaClient, StorageNetwork};

/// Error type for allowance-manager operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Remote API returned an error response.
    #[error("API error (HTTP {status}): {message}", status = status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".into()))]
    Api {
        message: String,
        status: Option<u16>,
    },

    /// Network connectivity or request failed.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse a response field.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The price ticker reported an error or lacked the requested pair.
    #[error("Ticker error: {0}")]
    Ticker(String),

    /// Exchange rate is not a positive finite number.
    #[error("Invalid exchange rate: {0}")]
    InvalidPrice(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network failures, error statuses and undecodable payloads
    Transport,
    /// Invalid policy values or configuration files
    Configuration,
    /// Local IO
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Api { .. }
            | Error::Network(_)
            | Error::Json(_)
            | Error::Parse(_)
            | Error::Ticker(_)
            | Error::InvalidPrice(_) => ErrorCategory::Transport,
            Error::Config(_) => ErrorCategory::Configuration,
            Error::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_transport_error(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Parse(e) => Error::Config(e.to_string()),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::ValidationErrors(errors) => Error::Config(errors.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One pass against the configured ticker and node.
pub async fn run_once(config: Config, dry_run: bool) -> Result<RunReport> {
    config.validate()?;
    let ticker = KrakenTicker::with_http(
        reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(Error::Network)?,
        config.ticker_url.clone(),
        config.ticker_pair.clone(),
    );
    let node = SiaClient::from_config(&config)?;
    AllowanceManager::new(config, ticker, node)
        .dry_run(dry_run)
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Api {
            message: "API authentication failed.".to_string(),
            status: Some(401),
        };
        assert_eq!(
            err.to_string(),
            "API error (HTTP 401): API authentication failed."
        );
    }

    #[test]
    fn test_error_categories() {
        assert!(Error::Ticker("EQuery:Unknown asset pair".into()).is_transport_error());
        assert!(Error::InvalidPrice("0".into()).is_transport_error());
        assert!(Error::Config("bad".into()).is_configuration_error());
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = config::ConfigError::InvalidValue {
            key: "redundancy".to_string(),
            message: "0.5 is below 1".to_string(),
        };
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("redundancy"));
    }
}
