//! Storage-network node adapter.
//!
//! The node owns all state: the host whitelist and the allowance record are
//! read and replaced here, never cached.

mod client;
mod types;

pub use client::{SIA_USER_AGENT, SiaClient};
pub use types::{
    Allowance, FilterMode, FilterModeRequest, FinancialMetrics, Host, HostDbAll, HostPublicKey,
    RenterSettings, RenterState,
};

use async_trait::async_trait;

use crate::Result;
use crate::allowance::AllowanceUpdate;

/// The four node operations a decision pass needs.
#[async_trait]
pub trait StorageNetwork: Send + Sync {
    /// Every host the node knows about, with its advertised prices.
    async fn hosts(&self) -> Result<Vec<Host>>;

    /// Replaces the whitelist wholesale. An empty list is still submitted.
    async fn replace_whitelist(&self, hosts: &[HostPublicKey]) -> Result<()>;

    async fn renter(&self) -> Result<RenterState>;

    async fn update_allowance(&self, update: &AllowanceUpdate) -> Result<()>;
}
