//! Core E2E testing framework

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tenor_config::ProtocolConfig;
use tenor_ledger::{derive_address, Clock, Market, PoolVenue, SharedMarket, TokenLedger};
use tenor_proxies::{ensure_no_residue, MigrationBridge, PoolProxy, RollEngine};
use tenor_types::{Address, Asset, Maturity, PoolId, WAD};
use tracing::{error, info};

/// Base liquidity each pool is seeded with
pub const SEED_BASE: u128 = 1_000 * WAD;

/// Claims sold into each pool right after seeding, so claims trade below par
pub const SEED_CLAIM_SALE: u128 = 344 * WAD / 10;

/// A market with seeded pools and one instance of every proxy
pub struct Deployment {
    pub config: ProtocolConfig,
    pub market: SharedMarket,
    pub pool_proxy: PoolProxy,
    pub roll: RollEngine,
    pub bridge: MigrationBridge,
    /// Pools in launch order, earliest term first when terms are sorted
    pub pools: Vec<(PoolId, Maturity)>,
}

/// Scenario contract
pub trait TestScenario {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Pools the deployment must have for the scenario to run
    fn pools_required(&self) -> usize {
        1
    }

    fn execute(&self, deployment: &mut Deployment) -> Result<ScenarioReport>;
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario: String,
    pub steps: Vec<String>,
    pub duration: Duration,
}

impl ScenarioReport {
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            steps: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn step(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        info!(scenario = %self.scenario, "{}", detail);
        self.steps.push(detail);
    }
}

impl Deployment {
    /// Open one pool per term (seconds after `now`), seed each with
    /// [`SEED_BASE`] and sell [`SEED_CLAIM_SALE`] claims into it
    pub fn launch(config: ProtocolConfig, now: u64, terms: &[u64]) -> Result<Self> {
        let mut market = Market::new(&config, now);
        let seeder = derive_address("tenor.seeder", 0);
        let mut pools = Vec::with_capacity(terms.len());

        for &term in terms {
            let maturity = Maturity::new(now + term);
            let pool = market.create_pool(maturity);
            market.mint_to(Asset::Base, seeder, SEED_BASE)?;
            market.mint_to(Asset::Claim(maturity), seeder, SEED_CLAIM_SALE)?;
            market
                .mint_liquidity(seeder, pool, seeder, SEED_BASE)
                .with_context(|| format!("Failed to seed {}", pool))?;
            market
                .sell_claim(seeder, pool, SEED_CLAIM_SALE)
                .with_context(|| format!("Failed to skew {}", pool))?;
            pools.push((pool, maturity));
        }
        info!("Launched market with {} pools", pools.len());

        let pool_proxy = PoolProxy::new(derive_address("tenor.pool-proxy", 0), &config);
        let roll = RollEngine::new(derive_address("tenor.roll", 0), &config);
        let bridge = MigrationBridge::new(
            derive_address("tenor.bridge", 0),
            pools.iter().map(|(pool, _)| *pool),
            &config,
        );

        Ok(Self {
            config,
            market: SharedMarket::new(market),
            pool_proxy,
            roll,
            bridge,
            pools,
        })
    }

    pub fn pool(&self, index: usize) -> Result<(PoolId, Maturity)> {
        self.pools
            .get(index)
            .copied()
            .with_context(|| format!("Deployment has no pool #{}", index))
    }

    pub fn fund(&self, account: Address, asset: Asset, amount: u128) -> Result<()> {
        self.market.execute(|m| m.mint_to(asset, account, amount))?;
        Ok(())
    }

    pub fn warp_to(&self, timestamp: u64) -> Result<()> {
        self.market.execute(|m| {
            info!(from = m.now(), to = timestamp, "Warping clock");
            m.set_time(timestamp);
            Ok(())
        })?;
        Ok(())
    }

    pub fn balance(&self, asset: Asset, account: Address) -> u128 {
        self.market.read(|m| m.balance_of(asset, account))
    }

    /// Fail unless `holder` keeps at most the configured rounding epsilon
    pub fn assert_clean(&self, holder: Address, assets: &[Asset]) -> Result<()> {
        let limit = self.config.proxy.rounding_epsilon as u128;
        self.market
            .read(|m| ensure_no_residue(m, holder, assets, limit))
            .with_context(|| format!("{:?} kept a residue", holder))
    }

    /// Execute `scenario` and time it
    pub fn run(&mut self, scenario: &dyn TestScenario) -> Result<ScenarioReport> {
        info!("Running scenario: {}", scenario.name());
        info!("Description: {}", scenario.description());
        anyhow::ensure!(
            self.pools.len() >= scenario.pools_required(),
            "{} needs {} pools, deployment has {}",
            scenario.name(),
            scenario.pools_required(),
            self.pools.len()
        );

        let start = Instant::now();
        match scenario.execute(self) {
            Ok(mut report) => {
                report.duration = start.elapsed();
                info!(
                    "Scenario {} passed in {:?} ({} steps)",
                    scenario.name(),
                    report.duration,
                    report.steps.len()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Scenario {} failed: {:#}", scenario.name(), e);
                Err(e)
            }
        }
    }
}
