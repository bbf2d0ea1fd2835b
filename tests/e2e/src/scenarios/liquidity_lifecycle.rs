//! Provide liquidity, trade against it, withdraw half early and the rest
//! after maturity

use crate::framework::{Deployment, ScenarioReport, TestScenario, SEED_BASE};
use anyhow::{ensure, Result};
use rust_decimal_macros::dec;
use tenor_ledger::{PoolVenue, PositionLedger, TokenLedger};
use tenor_proxies::{Authorizations, LIQUIDITY_COLLATERAL};
use tenor_types::{Address, Asset};

pub struct LiquidityLifecycle {
    pub provider: Address,
    pub trader: Address,
    /// Base the provider starts with and supplies
    pub amount: u128,
}

impl TestScenario for LiquidityLifecycle {
    fn name(&self) -> &str {
        "liquidity_lifecycle"
    }

    fn description(&self) -> &str {
        "Borrow-and-add liquidity, absorb a claim sale, remove half by selling and the rest at maturity"
    }

    fn execute(&self, deployment: &mut Deployment) -> Result<ScenarioReport> {
        let mut report = ScenarioReport::new(self.name());
        let (pool, maturity) = deployment.pool(0)?;
        let proxy = deployment.pool_proxy.clone();
        let (provider, amount) = (self.provider, self.amount);

        deployment.fund(provider, Asset::Base, amount)?;
        deployment.market.execute(|m| {
            m.approve(provider, proxy.address(), Asset::Base, true);
            m.position_gate_mut().add_delegate(provider, proxy.address());
            m.pool_gate_mut(pool)?.add_delegate(provider, proxy.address());
            Ok(())
        })?;
        report.step("Provider approved and delegated the pool proxy");

        let auths = Authorizations::delegated();
        let added = deployment
            .market
            .execute(|m| proxy.add_liquidity(m, provider, pool, amount, amount, &auths))?;
        report.step(format!(
            "Added {} base for {} shares against {} claim debt",
            added.base_supplied, added.shares, added.claim_debt
        ));
        ensure!(added.shares > 0, "no shares minted");

        let sale = amount * 2;
        deployment.fund(self.trader, Asset::Claim(maturity), sale)?;
        let proceeds = deployment
            .market
            .execute(|m| m.sell_claim(self.trader, pool, sale))?;
        report.step(format!("Trader sold {} claims for {} base", sale, proceeds));

        let half = added.shares / 2;
        let early = deployment.market.execute(|m| {
            proxy.remove_liquidity_by_selling(m, provider, pool, half, dec!(0), dec!(0), &auths)
        })?;
        report.step(format!(
            "Removed {} shares early: {} base paid, {} debt remaining",
            half, early.base_paid, early.debt_remaining
        ));

        deployment.warp_to(maturity.inner())?;
        // Enough redemption base for every outstanding claim
        let treasury = deployment.market.read(|m| m.treasury());
        deployment.fund(treasury, Asset::Base, SEED_BASE)?;

        let rest = added.shares - half;
        let late = deployment.market.execute(|m| {
            proxy.remove_liquidity_after_maturity(m, provider, pool, rest, &auths)
        })?;
        report.step(format!(
            "Removed {} shares after maturity: {} base paid",
            rest, late.base_paid
        ));

        let (debt, posted, shares) = deployment.market.read(|m| {
            (
                m.debt_claim(LIQUIDITY_COLLATERAL, maturity, provider),
                m.posted(LIQUIDITY_COLLATERAL, provider),
                m.balance_of(Asset::Shares(pool), provider),
            )
        });
        ensure!(debt == 0, "provider still owes {} claims", debt);
        ensure!(posted == 0, "provider still has {} collateral posted", posted);
        ensure!(shares == 0, "provider still holds {} shares", shares);

        let returned = deployment.balance(Asset::Base, provider);
        ensure!(
            returned >= amount * 9 / 10,
            "provider recovered only {} of {}",
            returned,
            amount
        );
        deployment.assert_clean(
            proxy.address(),
            &[
                Asset::Base,
                Asset::Claim(maturity),
                Asset::Shares(pool),
                Asset::Collateral(LIQUIDITY_COLLATERAL),
            ],
        )?;
        report.step(format!("Provider recovered {} base", returned));
        Ok(report)
    }
}
