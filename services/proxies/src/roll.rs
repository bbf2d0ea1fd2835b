//! Debt roll between maturities
//!
//! Moves part of a borrower's claim debt from one maturity to a later one in
//! a single unit. The engine flash-mints claims of the later maturity, sells
//! them for the base needed to extinguish the earlier debt, and then borrows
//! the same claims for the owner, which is what the lender burns.

use crate::flash_guard::verify_flash_callback;
use crate::pricing::ensure_max_amount;
use crate::residue::ensure_no_residue;
use crate::{log_flash, log_roll, log_success};
use tenor_config::ProtocolConfig;
use tenor_ledger::{Authorized, Environment, FlashBorrower, FlashRequest, SignedAuthorization};
use tenor_types::{
    Address, Asset, Collateral, Maturity, PoolId, ProtocolError, ProtocolResult, SlippageCheck,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollReceipt {
    /// Base-denominated debt extinguished at the earlier maturity
    pub debt_rolled: u128,
    /// Base spent doing so
    pub base_cost: u128,
    /// Claim debt opened at the later maturity, flash fee included
    pub new_debt: u128,
}

/// One roll, kept while the flash mint is outstanding
#[derive(Debug, Clone)]
struct RollTicket {
    auth: Authorized,
    collateral: Collateral,
    pool_a: PoolId,
    maturity_a: Maturity,
    pool_b: PoolId,
    maturity_b: Maturity,
    amount: u128,
    base_cost: u128,
    flash_amount: u128,
}

#[derive(Debug, Clone)]
pub struct RollEngine {
    address: Address,
    rounding_epsilon: u128,
    pending: Option<RollTicket>,
}

impl RollEngine {
    pub fn new(address: Address, config: &ProtocolConfig) -> Self {
        Self {
            address,
            rounding_epsilon: config.proxy.rounding_epsilon as u128,
            pending: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Base needed to extinguish `amount` of debt in `pool_a`'s maturity.
    ///
    /// Before maturity the claims are bought from the pool; afterwards the
    /// debt is repaid in base directly.
    pub fn base_cost_to_repay<E: Environment>(
        &self,
        env: &E,
        pool_a: PoolId,
        amount: u128,
    ) -> ProtocolResult<u128> {
        let maturity = env.pool(pool_a)?.maturity;
        if maturity.has_matured(env.now()) {
            return Ok(amount);
        }
        env.quote_buy_claim(pool_a, amount)
    }

    /// Move `amount` of `owner`'s base-denominated debt from `pool_a`'s
    /// maturity to `pool_b`'s, opening at most `max_new_debt` claims there
    #[allow(clippy::too_many_arguments)]
    pub fn roll_partial<E: Environment>(
        &mut self,
        env: &mut E,
        caller: Address,
        owner: Address,
        collateral: Collateral,
        pool_a: PoolId,
        pool_b: PoolId,
        amount: u128,
        max_new_debt: u128,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<RollReceipt> {
        log_roll!(
            "Rolling {} of {:?}'s debt from {} to {}",
            amount,
            owner,
            pool_a,
            pool_b
        );
        if caller != owner && !env.position_gate().is_delegate(owner, caller) {
            return Err(ProtocolError::NotAuthorized {
                owner,
                delegate: caller,
            });
        }
        if pool_a == pool_b {
            return Err(ProtocolError::InvalidAmount {
                reason: "roll into the same pool",
            });
        }
        if amount == 0 {
            return Err(ProtocolError::InvalidAmount {
                reason: "zero roll amount",
            });
        }
        let maturity_a = env.pool(pool_a)?.maturity;
        let maturity_b = env.pool(pool_b)?.maturity;
        if maturity_b.has_matured(env.now()) {
            return Err(ProtocolError::MaturityElapsed);
        }
        let debt = env.debt_base(collateral, maturity_a, owner)?;
        if amount > debt {
            return Err(ProtocolError::InsufficientLocalDebt {
                requested: amount,
                available: debt,
            });
        }
        let auth = env.authorize_position(owner, self.address, signature)?;

        let base_cost = self.base_cost_to_repay(env, pool_a, amount)?;
        let flash_amount = env.quote_buy_base(pool_b, base_cost)?;
        let new_debt = flash_amount
            .checked_add(env.flash_fee(flash_amount)?)
            .ok_or(ProtocolError::Arithmetic("roll debt overflow"))?;
        ensure_max_amount(SlippageCheck::MaxRollDebt, max_new_debt, new_debt)?;

        self.pending = Some(RollTicket {
            auth,
            collateral,
            pool_a,
            maturity_a,
            pool_b,
            maturity_b,
            amount,
            base_cost,
            flash_amount,
        });
        let flashed = env.flash_mint(pool_b, flash_amount, self);
        self.pending = None;
        flashed?;

        ensure_no_residue(
            env,
            self.address,
            &[Asset::Base, Asset::Claim(maturity_a), Asset::Claim(maturity_b)],
            self.rounding_epsilon,
        )?;
        log_success!(
            "Rolled {} debt from {} to {}: {} new claims owed",
            amount,
            maturity_a,
            maturity_b,
            new_debt
        );
        Ok(RollReceipt {
            debt_rolled: amount,
            base_cost,
            new_debt,
        })
    }

    /// Roll the owner's entire debt at `pool_a`'s maturity
    #[allow(clippy::too_many_arguments)]
    pub fn roll_all<E: Environment>(
        &mut self,
        env: &mut E,
        caller: Address,
        owner: Address,
        collateral: Collateral,
        pool_a: PoolId,
        pool_b: PoolId,
        max_new_debt: u128,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<RollReceipt> {
        let maturity_a = env.pool(pool_a)?.maturity;
        let amount = env.debt_base(collateral, maturity_a, owner)?;
        self.roll_partial(
            env,
            caller,
            owner,
            collateral,
            pool_a,
            pool_b,
            amount,
            max_new_debt,
            signature,
        )
    }
}

impl<E: Environment> FlashBorrower<E> for RollEngine {
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
                reason: "no roll in progress",
            })?;
        verify_flash_callback(env, self.address, ticket.pool_b, lender, request)?;
        if request.amount != ticket.flash_amount {
            return Err(ProtocolError::UnauthorizedCallback {
                reason: "loan amount differs from the roll",
            });
        }
        let owner = ticket.auth.owner();
        log_flash!("Roll flash of {} claims for {:?}", request.amount, owner);

        env.buy_base(self.address, ticket.pool_b, ticket.base_cost)?;
        if ticket.maturity_a.has_matured(env.now()) {
            env.repay_base(
                self.address,
                ticket.collateral,
                ticket.maturity_a,
                owner,
                ticket.base_cost,
            )?;
        } else {
            env.buy_claim(self.address, ticket.pool_a, ticket.amount)?;
            env.repay_claim(
                self.address,
                ticket.collateral,
                ticket.maturity_a,
                owner,
                ticket.amount,
            )?;
        }

        env.borrow(
            &ticket.auth,
            ticket.collateral,
            ticket.maturity_b,
            self.address,
            request.owed(),
        )
    }
}
