//! Foreign vault into a local claim-debt position

use super::{MigrationBridge, MigrationTicket};
use crate::pricing::ensure_max_price;
use crate::{log_bridge, log_execution, log_success};
use rust_decimal::Decimal;
use tenor_ledger::{Environment, SignedAuthorization};
use tenor_types::{ratio, Address, PoolId, ProtocolError, ProtocolResult, VaultHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReceipt {
    /// Collateral moved from the vault to the position ledger
    pub collateral_moved: u128,
    /// Normalized vault debt settled
    pub foreign_debt_settled: u128,
    /// Base paid to settle it
    pub base_settled: u128,
    /// Claim debt opened locally, flash fee included
    pub claim_debt: u128,
}

impl MigrationBridge {
    /// Move `locked` collateral and `normalized_debt` of vault `handle` into
    /// its owner's position at `pool`'s maturity.
    ///
    /// The caller and the bridge must both be allowed on the vault. The claim
    /// debt opened per unit of base settled may not exceed `max_claim_price`.
    #[allow(clippy::too_many_arguments)]
    pub fn import_position<E: Environment>(
        &mut self,
        env: &mut E,
        caller: Address,
        pool: PoolId,
        handle: VaultHandle,
        locked: u128,
        normalized_debt: u128,
        max_claim_price: Decimal,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<ImportReceipt> {
        log_execution!("Importing vault {} into {} for {:?}", handle, pool, caller);
        self.ensure_pool(pool)?;
        let vault = env.vault(handle)?;
        let owner = vault.owner;
        for who in [caller, self.address] {
            if !vault.can_manage(who) {
                return Err(ProtocolError::NotAuthorized {
                    owner,
                    delegate: who,
                });
            }
        }
        self.import_for(
            env,
            owner,
            pool,
            handle,
            locked,
            normalized_debt,
            max_claim_price,
            signature,
        )
    }

    /// Import a vault the caller has just given to the bridge, handing it
    /// back once the slice has moved.
    ///
    /// Giving the vault away and calling this belong in the same atomic unit.
    #[allow(clippy::too_many_arguments)]
    pub fn import_given_position<E: Environment>(
        &mut self,
        env: &mut E,
        caller: Address,
        pool: PoolId,
        handle: VaultHandle,
        locked: u128,
        normalized_debt: u128,
        max_claim_price: Decimal,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<ImportReceipt> {
        log_execution!("Importing given vault {} into {} for {:?}", handle, pool, caller);
        self.ensure_pool(pool)?;
        let holder = env.vault(handle)?.owner;
        if holder != self.address {
            return Err(ProtocolError::NotAuthorized {
                owner: holder,
                delegate: self.address,
            });
        }
        let receipt = self.import_for(
            env,
            caller,
            pool,
            handle,
            locked,
            normalized_debt,
            max_claim_price,
            signature,
        )?;
        env.give_vault(self.address, handle, caller)?;
        Ok(receipt)
    }

    #[allow(clippy::too_many_arguments)]
    fn import_for<E: Environment>(
        &mut self,
        env: &mut E,
        owner: Address,
        pool: PoolId,
        handle: VaultHandle,
        locked: u128,
        normalized_debt: u128,
        max_claim_price: Decimal,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<ImportReceipt> {
        let vault = env.vault(handle)?.clone();
        if normalized_debt > vault.normalized_debt {
            return Err(ProtocolError::InsufficientForeignDebt {
                requested: normalized_debt,
                available: vault.normalized_debt,
            });
        }
        if locked > vault.locked {
            return Err(ProtocolError::InsufficientForeignCollateral {
                requested: locked,
                available: vault.locked,
            });
        }
        let collateral = vault.collateral;
        let maturity = env.pool(pool)?.maturity;
        let auth = env.authorize_position(owner, self.address, signature)?;

        // Collateral only, nothing to borrow against
        if normalized_debt == 0 {
            env.settle_vault(self.address, handle, 0, locked)?;
            env.post(self.address, collateral, owner, locked)?;
            self.ensure_clean(env, maturity, collateral)?;
            log_success!("Imported {} collateral from vault {}", locked, handle);
            return Ok(ImportReceipt {
                collateral_moved: locked,
                foreign_debt_settled: 0,
                base_settled: 0,
                claim_debt: 0,
            });
        }

        let base_needed = env.base_to_settle(handle, normalized_debt)?;
        let flash_amount = env.quote_buy_base(pool, base_needed)?;
        let claim_debt = flash_amount
            .checked_add(env.flash_fee(flash_amount)?)
            .ok_or(ProtocolError::Arithmetic("import debt overflow"))?;
        ensure_max_price(max_claim_price, ratio(claim_debt, base_needed)?)?;
        log_bridge!(
            "Vault {} needs {} base, financed with {} claims of {}",
            handle,
            base_needed,
            claim_debt,
            maturity
        );

        self.run_flash(
            env,
            MigrationTicket::Import {
                auth,
                handle,
                collateral,
                pool,
                maturity,
                normalized_debt,
                locked,
                base_needed,
            },
            flash_amount,
        )?;

        self.ensure_clean(env, maturity, collateral)?;
        log_success!(
            "Imported vault {}: {} collateral, {} claim debt",
            handle,
            locked,
            claim_debt
        );
        Ok(ImportReceipt {
            collateral_moved: locked,
            foreign_debt_settled: normalized_debt,
            base_settled: base_needed,
            claim_debt,
        })
    }
}
