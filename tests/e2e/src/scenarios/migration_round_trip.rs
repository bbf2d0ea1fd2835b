//! Import a whole foreign vault by handing it to the bridge, then export
//! the position back into the same vault

use crate::framework::{Deployment, ScenarioReport, TestScenario};
use anyhow::{ensure, Result};
use rust_decimal_macros::dec;
use tenor_ledger::{ForeignLedger, PositionLedger};
use tenor_types::{Address, Asset, Collateral, RAY};

pub struct MigrationRoundTrip {
    pub owner: Address,
    /// Ether locked in the foreign vault
    pub locked: u128,
    /// Base drawn against it
    pub drawn: u128,
}

impl TestScenario for MigrationRoundTrip {
    fn name(&self) -> &str {
        "migration_round_trip"
    }

    fn description(&self) -> &str {
        "Give an ether vault to the bridge for import, then export the local position back"
    }

    fn execute(&self, deployment: &mut Deployment) -> Result<ScenarioReport> {
        let mut report = ScenarioReport::new(self.name());
        let (pool, maturity) = deployment.pool(0)?;
        let owner = self.owner;
        let collateral = Collateral::Ether;
        let bridge_address = deployment.bridge.address();

        deployment.fund(owner, Asset::Collateral(collateral), self.locked)?;
        let handle = deployment.market.execute(|m| {
            m.set_foreign_spot(collateral, 150 * RAY);
            m.set_foreign_rate(collateral, RAY / 20 * 21);
            m.set_collateral_spot(collateral, 150 * RAY);
            let handle = m.open_vault(owner, collateral);
            m.lock_and_draw(owner, handle, self.locked, self.drawn)?;
            m.position_gate_mut().add_delegate(owner, bridge_address);
            Ok(handle)
        })?;
        let foreign_debt = deployment.market.read(|m| m.vault_debt(handle))?;
        report.step(format!("Vault {} owes {} base", handle, foreign_debt));

        let Deployment { market, bridge, .. } = deployment;
        let (locked, normalized_debt) = market.read(|m| {
            m.vault(handle)
                .map(|vault| (vault.locked, vault.normalized_debt))
        })?;
        let imported = market.execute(|m| {
            m.give_vault(owner, handle, bridge.address())?;
            bridge.import_given_position(m, owner, pool, handle, locked, normalized_debt, dec!(1.1), None)
        })?;
        report.step(format!(
            "Imported {} ether and {} base of debt as {} claims",
            imported.collateral_moved, imported.base_settled, imported.claim_debt
        ));

        let (vault_owner, vault_locked, local_debt) = market.read(|m| {
            m.vault(handle).map(|vault| {
                (
                    vault.owner,
                    vault.locked,
                    m.debt_claim(collateral, maturity, owner),
                )
            })
        })?;
        ensure!(vault_owner == owner, "vault was not handed back");
        ensure!(vault_locked == 0, "{} ether left in the vault", vault_locked);
        ensure!(
            local_debt >= imported.base_settled,
            "local debt {} below the {} base settled",
            local_debt,
            imported.base_settled
        );

        market.execute(|m| m.allow_vault(owner, handle, bridge.address(), true))?;
        let exported = market.execute(|m| {
            bridge.export_position(m, owner, owner, pool, handle, locked, local_debt, dec!(1), None)
        })?;
        report.step(format!(
            "Exported back with {} base drawn on the vault",
            exported.base_drawn
        ));

        let (vault_locked, local_debt, posted) = market.read(|m| {
            m.vault(handle).map(|vault| {
                (
                    vault.locked,
                    m.debt_claim(collateral, maturity, owner),
                    m.posted(collateral, owner),
                )
            })
        })?;
        ensure!(vault_locked == locked, "vault holds {} of {}", vault_locked, locked);
        ensure!(local_debt == 0 && posted == 0, "local position not closed");
        deployment.assert_clean(
            bridge_address,
            &[Asset::Base, Asset::Claim(maturity), Asset::Collateral(collateral)],
        )?;

        let owner_base = deployment.balance(Asset::Base, owner);
        report.step(format!("Owner still holds the {} base drawn at the start", owner_base));
        Ok(report)
    }
}
