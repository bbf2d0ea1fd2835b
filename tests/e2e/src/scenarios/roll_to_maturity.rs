//! Borrow at the near maturity, roll it to the far one in two steps, then
//! repay and withdraw once the far maturity arrives

use crate::framework::{Deployment, ScenarioReport, TestScenario};
use anyhow::{ensure, Result};
use tenor_ledger::PositionLedger;
use tenor_types::{Address, Asset, Collateral};

pub struct RollToMaturity {
    pub owner: Address,
    pub collateral: u128,
    pub debt: u128,
}

impl TestScenario for RollToMaturity {
    fn name(&self) -> &str {
        "roll_to_maturity"
    }

    fn description(&self) -> &str {
        "Roll savings-backed debt from the first pool to the second and settle it at maturity"
    }

    fn pools_required(&self) -> usize {
        2
    }

    fn execute(&self, deployment: &mut Deployment) -> Result<ScenarioReport> {
        let mut report = ScenarioReport::new(self.name());
        let (pool_a, maturity_a) = deployment.pool(0)?;
        let (pool_b, maturity_b) = deployment.pool(1)?;
        ensure!(maturity_a < maturity_b, "pools must be ordered by maturity");
        let owner = self.owner;
        let collateral = Collateral::Savings;
        let engine = deployment.roll.address();

        deployment.fund(owner, Asset::Collateral(collateral), self.collateral)?;
        deployment.market.execute(|m| {
            m.post(owner, collateral, owner, self.collateral)?;
            let auth = m.authorize_position(owner, owner, None)?;
            m.borrow(&auth, collateral, maturity_a, owner, self.debt)?;
            m.position_gate_mut().add_delegate(owner, engine);
            Ok(())
        })?;
        report.step(format!("Borrowed {} claims of {}", self.debt, maturity_a));

        let first = self.debt / 2;
        let Deployment { market, roll, .. } = deployment;
        let partial = market.execute(|m| {
            roll.roll_partial(m, owner, owner, collateral, pool_a, pool_b, first, u128::MAX, None)
        })?;
        report.step(format!(
            "Rolled {} for {} base into {} claims of {}",
            partial.debt_rolled, partial.base_cost, partial.new_debt, maturity_b
        ));

        let rest = market.execute(|m| {
            roll.roll_all(m, owner, owner, collateral, pool_a, pool_b, u128::MAX, None)
        })?;
        report.step(format!("Rolled the remaining {}", rest.debt_rolled));

        let (debt_a, debt_b) = market.read(|m| {
            (
                m.debt_claim(collateral, maturity_a, owner),
                m.debt_claim(collateral, maturity_b, owner),
            )
        });
        ensure!(debt_a == 0, "{} claims still owed at {}", debt_a, maturity_a);
        ensure!(
            debt_b == partial.new_debt + rest.new_debt,
            "far debt {} does not match the rolls",
            debt_b
        );
        deployment.assert_clean(
            engine,
            &[Asset::Base, Asset::Claim(maturity_a), Asset::Claim(maturity_b)],
        )?;

        deployment.warp_to(maturity_b.inner())?;
        deployment.fund(owner, Asset::Base, debt_b)?;
        let withdrawn = deployment.market.execute(|m| {
            let owed = m.debt_base(collateral, maturity_b, owner)?;
            m.repay_base(owner, collateral, maturity_b, owner, owed)?;
            let auth = m.authorize_position(owner, owner, None)?;
            let free = m.free_collateral(collateral, owner)?;
            m.withdraw(&auth, collateral, owner, free)?;
            Ok(free)
        })?;
        report.step(format!("Repaid at maturity and withdrew {} collateral", withdrawn));

        ensure!(
            withdrawn == self.collateral,
            "withdrew {} of {} collateral",
            withdrawn,
            self.collateral
        );
        let leftover = deployment.balance(Asset::Base, owner);
        report.step(format!("Owner keeps {} base", leftover));
        Ok(report)
    }
}
