//! Host admission by fiat price ceilings.

use std::fmt;

use crate::config::{Config, decimal_to_f64};
use crate::currency::{BLOCKS_PER_MONTH, BYTES_PER_TB, Currency};
use crate::price::ExchangeRate;
use crate::renter::{Host, HostPublicKey};

/// Price attributes in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceDimension {
    Storage,
    Upload,
    Download,
    Collateral,
    ContractFormation,
}

impl PriceDimension {
    pub const ORDER: [Self; 5] = [
        Self::Storage,
        Self::Upload,
        Self::Download,
        Self::Collateral,
        Self::ContractFormation,
    ];

    /// Converts a raw per-unit price to the unit the ceiling is stated in.
    pub fn to_ceiling_unit(self, price: Currency) -> Currency {
        match self {
            Self::Storage | Self::Collateral => price.mul_u64(BYTES_PER_TB).mul_u64(BLOCKS_PER_MONTH),
            Self::Upload | Self::Download => price.mul_u64(BYTES_PER_TB),
            Self::ContractFormation => price,
        }
    }

    fn unit_suffix(self) -> &'static str {
        match self {
            Self::Storage | Self::Collateral => " / TB / month",
            Self::Upload | Self::Download => " / TB",
            Self::ContractFormation => "",
        }
    }

    fn host_price(self, host: &Host) -> Currency {
        match self {
            Self::Storage => host.storage_price,
            Self::Upload => host.upload_price,
            Self::Download => host.download_price,
            Self::Collateral => host.collateral,
            Self::ContractFormation => host.contract_price,
        }
    }
}

impl fmt::Display for PriceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Storage => "storage price",
            Self::Upload => "upload price",
            Self::Download => "download price",
            Self::Collateral => "collateral",
            Self::ContractFormation => "contract price",
        })
    }
}

/// Ceilings converted to hastings per byte (per block where applicable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLimits {
    pub storage: Currency,
    pub upload: Currency,
    pub download: Currency,
    pub collateral: Currency,
    pub contract_formation: Currency,
}

impl PriceLimits {
    pub fn from_config(config: &Config, rate: ExchangeRate) -> Self {
        let per_fiat = Currency::per_fiat_unit(rate);
        let divisor = config.ceiling_basis.host_divisor(config.redundancy_f64());
        let per_tb_month = |ceiling: f64| {
            per_fiat
                .mul_f64(ceiling / divisor)
                .div_u64(BYTES_PER_TB)
                .div_u64(BLOCKS_PER_MONTH)
        };
        let per_tb = |ceiling: f64| per_fiat.mul_f64(ceiling).div_u64(BYTES_PER_TB);

        Self {
            storage: per_tb_month(decimal_to_f64(config.max_storage_price_tb_month)),
            upload: per_tb(decimal_to_f64(config.max_upload_price_tb)),
            download: per_tb(decimal_to_f64(config.max_download_price_tb)),
            collateral: per_tb_month(decimal_to_f64(config.max_collateral_tb_month)),
            contract_formation: per_fiat
                .mul_f64(decimal_to_f64(config.max_contract_formation_price)),
        }
    }

    pub fn limit(&self, dimension: PriceDimension) -> Currency {
        match dimension {
            PriceDimension::Storage => self.storage,
            PriceDimension::Upload => self.upload,
            PriceDimension::Download => self.download,
            PriceDimension::Collateral => self.collateral,
            PriceDimension::ContractFormation => self.contract_formation,
        }
    }

    /// First dimension, in check order, whose price is strictly above its
    /// limit.
    pub fn first_violation(&self, host: &Host) -> Option<PriceDimension> {
        PriceDimension::ORDER
            .into_iter()
            .find(|&dimension| dimension.host_price(host) > self.limit(dimension))
    }

    fn log(&self, rate: ExchangeRate) {
        tracing::debug!(
            "1 fiat = {}",
            Currency::per_fiat_unit(rate).human_string()
        );
        for dimension in PriceDimension::ORDER {
            let limit = self.limit(dimension);
            tracing::debug!(
                "Max {}: {} ({}{})",
                dimension,
                limit.human_string(),
                dimension.to_ceiling_unit(limit).human_string(),
                dimension.unit_suffix(),
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub host: HostPublicKey,
    pub dimension: PriceDimension,
    pub price: Currency,
    pub limit: Currency,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Host {} rejected. {} of {}{} too high",
            self.host,
            self.dimension,
            self.dimension.to_ceiling_unit(self.price).human_string(),
            self.dimension.unit_suffix(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub admitted: Vec<HostPublicKey>,
    pub rejected: Vec<Rejection>,
}

impl FilterOutcome {
    pub fn total(&self) -> usize {
        self.admitted.len() + self.rejected.len()
    }
}

#[derive(Debug, Clone)]
pub struct HostFilter {
    limits: PriceLimits,
}

impl HostFilter {
    pub fn new(config: &Config, rate: ExchangeRate) -> Self {
        let limits = PriceLimits::from_config(config, rate);
        limits.log(rate);
        Self { limits }
    }

    pub fn with_limits(limits: PriceLimits) -> Self {
        Self { limits }
    }

    pub fn evaluate(&self, hosts: &[Host]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for host in hosts {
            match self.limits.first_violation(host) {
                Some(dimension) => {
                    let rejection = Rejection {
                        host: host.public_key.clone(),
                        dimension,
                        price: dimension.host_price(host),
                        limit: self.limits.limit(dimension),
                    };
                    tracing::debug!("{}", rejection);
                    outcome.rejected.push(rejection);
                }
                None => {
                    tracing::debug!("Host {} accepted", host.public_key);
                    outcome.admitted.push(host.public_key.clone());
                }
            }
        }

        tracing::debug!(
            "{} acceptable hosts out of {} total hosts",
            outcome.admitted.len(),
            outcome.total()
        );
        outcome
    }
}
