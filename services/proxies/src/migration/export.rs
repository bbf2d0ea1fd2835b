//! Local claim-debt position out to a foreign vault

use super::{MigrationBridge, MigrationTicket};
use crate::pricing::ensure_max_price;
use crate::{log_bridge, log_execution, log_success};
use rust_decimal::Decimal;
use tenor_ledger::{Environment, SignedAuthorization};
use tenor_types::{ratio, Address, PoolId, ProtocolError, ProtocolResult, VaultHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReceipt {
    /// Collateral moved from the position ledger into the vault
    pub collateral_moved: u128,
    /// Local claim debt closed
    pub claim_repaid: u128,
    /// Base drawn from the vault to buy the claims back
    pub base_drawn: u128,
    /// Normalized vault debt added
    pub foreign_debt_added: u128,
}

impl MigrationBridge {
    /// Close `claim_amount` of `owner`'s debt at `pool`'s maturity and move
    /// `locked` collateral into vault `handle`, financing the repayment with
    /// a draw on the vault.
    ///
    /// `caller` must be the owner or the owner's ledger delegate, and both the
    /// caller and the bridge must be able to manage the vault. Base drawn per
    /// claim repaid may not exceed `max_base_price`.
    #[allow(clippy::too_many_arguments)]
    pub fn export_position<E: Environment>(
        &mut self,
        env: &mut E,
        caller: Address,
        owner: Address,
        pool: PoolId,
        handle: VaultHandle,
        locked: u128,
        claim_amount: u128,
        max_base_price: Decimal,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<ExportReceipt> {
        log_execution!("Exporting {:?}'s position in {} to vault {}", owner, pool, handle);
        self.ensure_pool(pool)?;
        if caller != owner && !env.position_gate().is_delegate(owner, caller) {
            return Err(ProtocolError::NotAuthorized {
                owner,
                delegate: caller,
            });
        }
        let vault = env.vault(handle)?;
        let (vault_owner, collateral) = (vault.owner, vault.collateral);
        for who in [caller, self.address] {
            if !vault.can_manage(who) {
                return Err(ProtocolError::NotAuthorized {
                    owner: vault_owner,
                    delegate: who,
                });
            }
        }

        let maturity = env.pool(pool)?.maturity;
        let debt = env.debt_claim(collateral, maturity, owner);
        if claim_amount > debt {
            return Err(ProtocolError::InsufficientLocalDebt {
                requested: claim_amount,
                available: debt,
            });
        }
        let posted = env.posted(collateral, owner);
        if locked > posted {
            return Err(ProtocolError::InsufficientLocalCollateral {
                requested: locked,
                available: posted,
            });
        }
        let auth = env.authorize_position(owner, self.address, signature)?;

        // No debt to move, only collateral
        if claim_amount == 0 {
            env.withdraw(&auth, collateral, self.address, locked)?;
            env.lock_and_draw(self.address, handle, locked, 0)?;
            self.ensure_clean(env, maturity, collateral)?;
            log_success!("Exported {} collateral to vault {}", locked, handle);
            return Ok(ExportReceipt {
                collateral_moved: locked,
                claim_repaid: 0,
                base_drawn: 0,
                foreign_debt_added: 0,
            });
        }

        let owed = claim_amount
            .checked_add(env.flash_fee(claim_amount)?)
            .ok_or(ProtocolError::Arithmetic("export debt overflow"))?;
        let base_needed = env.quote_buy_claim(pool, owed)?;
        ensure_max_price(max_base_price, ratio(base_needed, claim_amount)?)?;
        log_bridge!(
            "Closing {} claims of {} with {} base drawn on vault {}",
            claim_amount,
            maturity,
            base_needed,
            handle
        );

        let debt_before = env.vault(handle)?.normalized_debt;
        self.run_flash(
            env,
            MigrationTicket::Export {
                auth,
                handle,
                collateral,
                pool,
                maturity,
                claim_amount,
                locked,
                base_needed,
            },
            claim_amount,
        )?;
        let foreign_debt_added = env
            .vault(handle)?
            .normalized_debt
            .saturating_sub(debt_before);

        self.ensure_clean(env, maturity, collateral)?;
        log_success!(
            "Exported to vault {}: {} collateral, {} base drawn",
            handle,
            locked,
            base_needed
        );
        Ok(ExportReceipt {
            collateral_moved: locked,
            claim_repaid: claim_amount,
            base_drawn: base_needed,
            foreign_debt_added,
        })
    }
}
