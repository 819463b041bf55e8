//! Validates policy values before any request is made.

use rust_decimal::Decimal;

use super::{Config, ConfigError, ConfigResult, ValidationErrors};
use crate::currency::Currency;

impl Config {
    /// Checks every value and reports all problems at once.
    pub fn validate(&self) -> ConfigResult<()> {
        let errors = self.collect_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }

    fn collect_errors(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let ceilings = [
            ("max_storage_price_tb_month", self.max_storage_price_tb_month),
            ("max_download_price_tb", self.max_download_price_tb),
            ("max_upload_price_tb", self.max_upload_price_tb),
            ("max_contract_formation_price", self.max_contract_formation_price),
            ("max_collateral_tb_month", self.max_collateral_tb_month),
        ];
        for (key, value) in ceilings {
            if value <= Decimal::ZERO {
                errors.push(ConfigError::invalid(key, format!("{} must be positive", value)));
            }
        }

        if self.redundancy < Decimal::ONE {
            errors.push(ConfigError::invalid(
                "redundancy",
                format!("{} is below 1", self.redundancy),
            ));
        }

        if self.hosts == 0 {
            errors.push(ConfigError::invalid("hosts", "must be at least 1"));
        }
        if self.contract_length == 0 {
            errors.push(ConfigError::invalid("contract_length", "must be at least 1 block"));
        }
        if self.renew_window == 0 || self.renew_window >= self.contract_length {
            errors.push(ConfigError::invalid(
                "renew_window",
                format!(
                    "{} must be between 1 and contract_length ({})",
                    self.renew_window, self.contract_length
                ),
            ));
        }

        match Currency::from_coins_decimal(self.min_funds) {
            Some(funds) if !funds.is_zero() => {}
            _ => errors.push(ConfigError::invalid(
                "min_funds",
                format!("{} must be a positive amount of coins", self.min_funds),
            )),
        }

        let band = &self.hysteresis;
        if band.low <= Decimal::ZERO || band.low >= band.high {
            errors.push(ConfigError::invalid(
                "hysteresis",
                format!("need 0 < low < high, got low {} high {}", band.low, band.high),
            ));
        }
        if band.margin <= Decimal::ZERO || band.margin >= Decimal::ONE {
            errors.push(ConfigError::invalid(
                "hysteresis.margin",
                format!("{} must be between 0 and 1", band.margin),
            ));
        }

        if self.request_timeout_secs == 0 {
            errors.push(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }
        if self.sia_api_address.trim().is_empty() {
            errors.push(ConfigError::invalid("sia_api_address", "must not be empty"));
        }
        if let Err(e) = url::Url::parse(&self.ticker_url) {
            errors.push(ConfigError::invalid("ticker_url", e.to_string()));
        }
        if self.ticker_pair.trim().is_empty() {
            errors.push(ConfigError::invalid("ticker_pair", "must not be empty"));
        }

        errors
    }
}
