//! Allowance feedback controller.
//!
//! Keeps the unspent, unallocated share of the allowance inside a dead band.
//! When it drops to the low bound the allowance grows by one margin; when it
//! climbs to the high bound it shrinks by one margin. Inside the band nothing
//! is written, so repeated runs do not oscillate.

use rust_decimal::Decimal;

use crate::config::{Config, HysteresisPolicy, decimal_to_f64};
use crate::currency::{BLOCKS_PER_MONTH, BYTES_PER_TB, Currency, format_bytes};
use crate::price::ExchangeRate;
use crate::renter::RenterState;

/// Expected upload volume relative to stored data.
pub const UPLOAD_RATIO: f64 = 0.1;
/// Expected download volume relative to stored data.
pub const DOWNLOAD_RATIO: f64 = 0.2;

/// Quantities derived from the account before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    /// Funds as reported by the node.
    pub reported_funds: Currency,
    /// Funds after applying the minimum floor.
    pub funds: Currency,
    pub spent: Currency,
    pub unspent_allocated: Currency,
    pub unspent_unallocated: Currency,
    pub low_bound: Currency,
    pub high_bound: Currency,
    pub adjust_margin: Currency,
}

impl Assessment {
    pub fn new(state: &RenterState, policy: &HysteresisPolicy, min_funds: Currency) -> Self {
        let metrics = &state.financial_metrics;
        let reported_funds = state.allowance().funds;
        let funds = reported_funds.max(min_funds);

        Self {
            reported_funds,
            funds,
            spent: metrics.spent(),
            unspent_allocated: metrics.unspent_allocated(),
            unspent_unallocated: metrics.unspent_unallocated(),
            low_bound: funds.mul_fraction(policy.low),
            high_bound: funds.mul_fraction(policy.high),
            adjust_margin: funds.mul_fraction(policy.margin),
        }
    }

    pub fn is_floored(&self) -> bool {
        self.funds != self.reported_funds
    }
}

/// Target usage derived from a funds value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageTargets {
    pub fiat: f64,
    pub months: f64,
    pub fiat_per_month: f64,
    /// Bytes.
    pub storage: f64,
    /// Bytes over the whole period.
    pub upload: f64,
    /// Bytes over the whole period.
    pub download: f64,
}

impl UsageTargets {
    /// Storage that `funds` buys per month at the effective storage ceiling.
    ///
    /// `period` must be non-zero.
    pub fn estimate(funds: Currency, rate: ExchangeRate, period: u64, config: &Config) -> Self {
        let fiat = funds.to_fiat(rate);
        let months = period as f64 / BLOCKS_PER_MONTH as f64;
        let fiat_per_month = fiat / months;
        let storage = fiat_per_month / effective_storage_cost(config) * BYTES_PER_TB as f64;

        Self {
            fiat,
            months,
            fiat_per_month,
            storage,
            upload: storage * UPLOAD_RATIO,
            download: storage * DOWNLOAD_RATIO,
        }
    }
}

/// Fiat cost of keeping one TB of user data for a month at the ceiling.
pub fn effective_storage_cost(config: &Config) -> f64 {
    decimal_to_f64(config.max_storage_price_tb_month)
        * config.ceiling_basis.cost_multiplier(config.redundancy_f64())
}

/// Partial allowance update submitted to the node in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceUpdate {
    pub funds: Currency,
    /// Bytes.
    pub expected_storage: u64,
    /// Bytes per block.
    pub expected_upload: u64,
    /// Bytes per block.
    pub expected_download: u64,
    pub expected_redundancy: Decimal,
    pub hosts: u64,
    /// Blocks.
    pub period: u64,
    /// Blocks.
    pub renew_window: u64,
}

impl AllowanceUpdate {
    /// `period` is the divisor for the per-block upload and download rates.
    pub fn new(funds: Currency, targets: &UsageTargets, period: u64, config: &Config) -> Self {
        Self {
            funds,
            expected_storage: targets.storage as u64,
            expected_upload: (targets.upload / period as f64) as u64,
            expected_download: (targets.download / period as f64) as u64,
            expected_redundancy: config.redundancy,
            hosts: config.hosts,
            period: config.contract_length,
            renew_window: config.renew_window,
        }
    }

    /// Form parameters understood by `POST /renter`.
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("funds", self.funds.to_string()),
            ("hosts", self.hosts.to_string()),
            ("period", self.period.to_string()),
            ("renewwindow", self.renew_window.to_string()),
            ("expectedstorage", self.expected_storage.to_string()),
            ("expectedupload", self.expected_upload.to_string()),
            ("expecteddownload", self.expected_download.to_string()),
            ("expectedredundancy", self.expected_redundancy.normalize().to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Inside the band; nothing is written.
    Hold,
    Increase {
        margin: Currency,
        update: AllowanceUpdate,
    },
    Decrease {
        margin: Currency,
        update: AllowanceUpdate,
    },
}

impl Decision {
    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Hold)
    }

    pub fn update(&self) -> Option<&AllowanceUpdate> {
        match self {
            Self::Hold => None,
            Self::Increase { update, .. } | Self::Decrease { update, .. } => Some(update),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Increase { .. } => "increase",
            Self::Decrease { .. } => "decrease",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AllowanceController<'a> {
    config: &'a Config,
}

impl<'a> AllowanceController<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn assess(&self, state: &RenterState) -> Assessment {
        Assessment::new(state, &self.config.hysteresis, self.config.min_funds())
    }

    /// Period used for the monthly budget. Accounts without an allowance
    /// report zero, in which case the configured contract length applies.
    pub fn budget_period(&self, state: &RenterState) -> u64 {
        match state.allowance().period {
            0 => self.config.contract_length,
            period => period,
        }
    }

    /// `assessment` must come from [`Self::assess`] on the same `state`.
    pub fn decide(
        &self,
        rate: ExchangeRate,
        state: &RenterState,
        assessment: &Assessment,
    ) -> Decision {
        if assessment.is_floored() {
            tracing::info!(
                "Allowance of {} is below minimum. Defaulting to {}",
                assessment.reported_funds.human_string(),
                assessment.funds.human_string()
            );
        }

        tracing::debug!(
            "Unallocated lower bound: {}, current: {}, higher bound: {}",
            assessment.low_bound.human_string(),
            assessment.unspent_unallocated.human_string(),
            assessment.high_bound.human_string(),
        );

        let margin = assessment.adjust_margin;
        let increase = if assessment.unspent_unallocated <= assessment.low_bound {
            true
        } else if assessment.unspent_unallocated >= assessment.high_bound {
            false
        } else {
            tracing::debug!(
                "Enough margin left. No need to change allowance. Funds: {} Unspent unallocated: {}",
                assessment.funds.human_string(),
                assessment.unspent_unallocated.human_string(),
            );
            return Decision::Hold;
        };

        let funds = if increase {
            let funds = assessment.funds.saturating_add(margin);
            tracing::debug!("Funds too low. Increasing to: {}", funds.human_string());
            funds
        } else {
            let funds = assessment.funds.saturating_sub(margin);
            tracing::debug!("Funds too high. Decreasing to: {}", funds.human_string());
            funds
        };

        let period = self.budget_period(state);
        let targets = UsageTargets::estimate(funds, rate, period, self.config);
        tracing::debug!(
            "SC {:.3}, fiat {:.3}, months {:.3}, fiat/month {:.3}, storage {}, upload {}, download {}",
            funds.to_coins_f64(),
            targets.fiat,
            targets.months,
            targets.fiat_per_month,
            format_bytes(targets.storage as u64),
            format_bytes(targets.upload as u64),
            format_bytes(targets.download as u64),
        );

        let update = AllowanceUpdate::new(funds, &targets, period, self.config);
        if increase {
            Decision::Increase { margin, update }
        } else {
            Decision::Decrease { margin, update }
        }
    }
}
