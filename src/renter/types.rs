//! Wire types of the node API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::currency::Currency;

/// Host identity as the node prints it, e.g. `ed25519:1f2e...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostPublicKey(String);

impl HostPublicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A host directory entry. Prices are per byte (storage and collateral per
/// byte per block) except the one-time contract fee.
#[derive(Debug, Clone, Deserialize)]
pub struct Host {
    #[serde(rename = "publickeystring")]
    pub public_key: HostPublicKey,
    #[serde(rename = "storageprice")]
    pub storage_price: Currency,
    #[serde(rename = "uploadbandwidthprice")]
    pub upload_price: Currency,
    #[serde(rename = "downloadbandwidthprice")]
    pub download_price: Currency,
    pub collateral: Currency,
    #[serde(rename = "contractprice")]
    pub contract_price: Currency,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostDbAll {
    #[serde(default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Disable,
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterModeRequest<'a> {
    #[serde(rename = "filtermode")]
    pub filter_mode: FilterMode,
    pub hosts: &'a [HostPublicKey],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Allowance {
    pub funds: Currency,
    /// Blocks.
    pub period: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenterSettings {
    pub allowance: Allowance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FinancialMetrics {
    #[serde(rename = "contractfees")]
    pub contract_fees: Currency,
    #[serde(rename = "totalallocated")]
    pub total_allocated: Currency,
    #[serde(rename = "uploadspending")]
    pub upload_spending: Currency,
    #[serde(rename = "downloadspending")]
    pub download_spending: Currency,
    #[serde(rename = "storagespending")]
    pub storage_spending: Currency,
    pub unspent: Currency,
}

impl FinancialMetrics {
    pub fn spent(&self) -> Currency {
        self.contract_fees
            .saturating_add(self.upload_spending)
            .saturating_add(self.download_spending)
            .saturating_add(self.storage_spending)
    }

    /// Allocated to contracts but not yet spent, floored at zero.
    pub fn unspent_allocated(&self) -> Currency {
        self.total_allocated.saturating_sub(self.spent())
    }

    /// The free margin the controller regulates, floored at zero.
    pub fn unspent_unallocated(&self) -> Currency {
        self.unspent.saturating_sub(self.unspent_allocated())
    }
}

/// Account snapshot from `GET /renter`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenterState {
    pub settings: RenterSettings,
    #[serde(rename = "financialmetrics")]
    pub financial_metrics: FinancialMetrics,
}

impl RenterState {
    pub fn allowance(&self) -> &Allowance {
        &self.settings.allowance
    }
}
