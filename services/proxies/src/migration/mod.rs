//! Position migration between the foreign ledger and the position ledger
//!
//! Both directions run inside one flash mint of the target pool's claims:
//!
//! ```text
//! import: flash claims ─► sell for base ─► settle foreign vault ─► post collateral ─► borrow claims (repays flash)
//! export: flash claims ─► repay local debt ─► withdraw collateral ─► lock & draw base ─► buy claims (repays flash)
//! ```
//!
//! The bridge accepts a flash callback only while it holds a ticket for a
//! migration it started itself.

mod export;
mod import;

pub use export::ExportReceipt;
pub use import::ImportReceipt;

use crate::flash_guard::verify_flash_callback;
use crate::log_flash;
use crate::residue::ensure_no_residue;
use std::collections::BTreeSet;
use tenor_config::ProtocolConfig;
use tenor_ledger::{Authorized, Environment, FlashBorrower, FlashRequest};
use tenor_types::{
    Address, Asset, Collateral, Maturity, PoolId, ProtocolError, ProtocolResult, VaultHandle,
};

/// Migration in flight while the flash mint is outstanding
#[derive(Debug, Clone)]
pub(crate) enum MigrationTicket {
    Import {
        auth: Authorized,
        handle: VaultHandle,
        collateral: Collateral,
        pool: PoolId,
        maturity: Maturity,
        normalized_debt: u128,
        locked: u128,
        base_needed: u128,
    },
    Export {
        auth: Authorized,
        handle: VaultHandle,
        collateral: Collateral,
        pool: PoolId,
        maturity: Maturity,
        claim_amount: u128,
        locked: u128,
        base_needed: u128,
    },
}

impl MigrationTicket {
    fn pool(&self) -> PoolId {
        match self {
            Self::Import { pool, .. } | Self::Export { pool, .. } => *pool,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationBridge {
    address: Address,
    pools: BTreeSet<PoolId>,
    rounding_epsilon: u128,
    pending: Option<MigrationTicket>,
}

impl MigrationBridge {
    pub fn new(
        address: Address,
        pools: impl IntoIterator<Item = PoolId>,
        config: &ProtocolConfig,
    ) -> Self {
        Self {
            address,
            pools: pools.into_iter().collect(),
            rounding_epsilon: config.proxy.rounding_epsilon as u128,
            pending: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn serves(&self, pool: PoolId) -> bool {
        self.pools.contains(&pool)
    }

    /// `(bridge_can_manage_vault, bridge_is_ledger_delegate)` for importing
    /// `handle` on `caller`'s behalf
    pub fn import_check<E: Environment>(&self, env: &E, handle: VaultHandle, caller: Address) -> (bool, bool) {
        self.access_check(env, handle, caller)
    }

    /// `(bridge_can_manage_vault, bridge_is_ledger_delegate)` for exporting
    /// into `handle` on `caller`'s behalf
    pub fn export_check<E: Environment>(&self, env: &E, handle: VaultHandle, caller: Address) -> (bool, bool) {
        self.access_check(env, handle, caller)
    }

    fn access_check<E: Environment>(&self, env: &E, handle: VaultHandle, caller: Address) -> (bool, bool) {
        (
            env.can_manage(handle, self.address),
            env.position_gate().is_delegate(caller, self.address),
        )
    }

    fn ensure_pool(&self, pool: PoolId) -> ProtocolResult<()> {
        if !self.serves(pool) {
            return Err(ProtocolError::UnknownPool(pool));
        }
        Ok(())
    }

    /// Run `ticket`'s flash mint, clearing the ticket whatever the outcome
    fn run_flash<E: Environment>(
        &mut self,
        env: &mut E,
        ticket: MigrationTicket,
        amount: u128,
    ) -> ProtocolResult<()> {
        let pool = ticket.pool();
        self.pending = Some(ticket);
        let flashed = env.flash_mint(pool, amount, self);
        self.pending = None;
        flashed
    }

    fn ensure_clean<E: Environment>(
        &self,
        env: &E,
        maturity: Maturity,
        collateral: Collateral,
    ) -> ProtocolResult<()> {
        ensure_no_residue(
            env,
            self.address,
            &[
                Asset::Base,
                Asset::Claim(maturity),
                Asset::Collateral(collateral),
            ],
            self.rounding_epsilon,
        )
    }
}

impl<E: Environment> FlashBorrower<E> for MigrationBridge {
    fn flash_address(&self) -> Address {
        self.address
    }

    fn on_flash_loan(
        &mut self,
        env: &mut E,
        lender: Address,
        request: &FlashRequest,
    ) -> ProtocolResult<()> {
        let ticket = self
            .pending
            .clone()
            .ok_or(ProtocolError::UnauthorizedCallback {
                reason: "no migration in progress",
            })?;
        verify_flash_callback(env, self.address, ticket.pool(), lender, request)?;
        log_flash!("Migration flash of {} claims from {}", request.amount, request.pool);

        match ticket {
            MigrationTicket::Import {
                auth,
                handle,
                collateral,
                pool,
                maturity,
                normalized_debt,
                locked,
                base_needed,
            } => {
                env.buy_base(self.address, pool, base_needed)?;
                env.settle_vault(self.address, handle, normalized_debt, locked)?;
                env.post(self.address, collateral, auth.owner(), locked)?;
                env.borrow(&auth, collateral, maturity, self.address, request.owed())
            }
            MigrationTicket::Export {
                auth,
                handle,
                collateral,
                pool,
                maturity,
                claim_amount,
                locked,
                base_needed,
            } => {
                env.repay_claim(self.address, collateral, maturity, auth.owner(), claim_amount)?;
                env.withdraw(&auth, collateral, self.address, locked)?;
                env.lock_and_draw(self.address, handle, locked, base_needed)?;
                env.buy_claim(self.address, pool, request.owed())?;
                Ok(())
            }
        }
    }
}
