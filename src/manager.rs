//! One decision pass: price, host filter, allowance.

use crate::Result;
use crate::allowance::{AllowanceController, Assessment, Decision};
use crate::config::Config;
use crate::filter::{FilterOutcome, HostFilter};
use crate::price::{ExchangeRate, PriceOracle};
use crate::renter::StorageNetwork;

/// What a pass observed and decided.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub rate: ExchangeRate,
    pub filter: FilterOutcome,
    pub assessment: Assessment,
    pub decision: Decision,
    /// False in dry-run mode.
    pub applied: bool,
}

/// Runs the controller once against a node.
///
/// The filter update and the allowance update are separate requests. A
/// failure in the second leaves the first in place.
pub struct AllowanceManager<O, N> {
    config: Config,
    oracle: O,
    network: N,
    dry_run: bool,
}

impl<O: PriceOracle, N: StorageNetwork> AllowanceManager<O, N> {
    pub fn new(config: Config, oracle: O, network: N) -> Self {
        Self {
            config,
            oracle,
            network,
            dry_run: false,
        }
    }

    /// Compute and log everything but skip both writes.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validates the configuration, then performs the pass. Nothing is
    /// written unless validation succeeds.
    pub async fn run(&self) -> Result<RunReport> {
        self.config.validate()?;

        let rate = self.oracle.fetch_rate().await?;
        tracing::info!(oracle = self.oracle.name(), fiat_per_coin = rate.fiat_per_coin(), "exchange rate");

        let filter = self.filter_hosts(rate).await?;
        let (assessment, decision) = self.adjust_allowance(rate).await?;

        Ok(RunReport {
            rate,
            filter,
            assessment,
            decision,
            applied: !self.dry_run,
        })
    }

    async fn filter_hosts(&self, rate: ExchangeRate) -> Result<FilterOutcome> {
        let filter = HostFilter::new(&self.config, rate);
        let hosts = self.network.hosts().await?;
        let outcome = filter.evaluate(&hosts);

        tracing::info!(
            admitted = outcome.admitted.len(),
            total = outcome.total(),
            "host filter evaluated"
        );
        if outcome.admitted.is_empty() {
            tracing::warn!("no host passes the price ceilings; whitelist will be empty");
        }

        if self.dry_run {
            tracing::info!("dry run: whitelist not submitted");
        } else {
            self.network.replace_whitelist(&outcome.admitted).await?;
        }
        Ok(outcome)
    }

    async fn adjust_allowance(&self, rate: ExchangeRate) -> Result<(Assessment, Decision)> {
        let state = self.network.renter().await?;
        let controller = AllowanceController::new(&self.config);
        let assessment = controller.assess(&state);
        let decision = controller.decide(rate, &state, &assessment);

        match decision.update() {
            None => tracing::info!(
                funds = %assessment.funds.human_string(),
                "allowance within band"
            ),
            Some(update) if self.dry_run => tracing::info!(
                decision = decision.label(),
                funds = %update.funds.human_string(),
                "dry run: allowance not submitted"
            ),
            Some(update) => {
                self.network.update_allowance(update).await?;
                tracing::info!(
                    decision = decision.label(),
                    funds = %update.funds.human_string(),
                    "allowance updated"
                );
            }
        }
        Ok((assessment, decision))
    }
}
