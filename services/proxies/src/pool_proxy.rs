//! Liquidity provision against borrowed claims
//!
//! The proxy lets a user provide liquidity with base currency only. The claim
//! side of the deposit is either borrowed from the position ledger against
//! wrapped savings collateral, or bought from the pool itself. Removals unwind
//! the same path and always finish with the proxy holding nothing.

use crate::pricing::{
    ensure_max_amount, ensure_min_price, matching_base, proportional_claim_debt,
};
use crate::residue::ensure_no_residue;
use crate::{log_execution, log_pool, log_success};
use rust_decimal::Decimal;
use tenor_amm::LiquiditySolver;
use tenor_config::{ProtocolConfig, SolverSettings};
use tenor_ledger::{Authorized, Environment, SignedAuthorization};
use tenor_types::{
    mul_div_up, ratio, Address, Asset, Collateral, Maturity, PoolId, ProtocolError,
    ProtocolResult, SlippageCheck, RAY,
};
use tracing::{debug, warn};

/// Collateral backing the claim debt opened for liquidity
pub const LIQUIDITY_COLLATERAL: Collateral = Collateral::Savings;

/// Signed authorizations accompanying a call.
///
/// `None` entries fall back to a standing delegation on that gate.
#[derive(Debug, Clone, Default)]
pub struct Authorizations {
    pub ledger: Option<SignedAuthorization>,
    pub pool: Option<SignedAuthorization>,
}

impl Authorizations {
    /// Rely on standing delegations only
    pub fn delegated() -> Self {
        Self::default()
    }

    pub fn with_ledger(mut self, signature: SignedAuthorization) -> Self {
        self.ledger = Some(signature);
        self
    }

    pub fn with_pool(mut self, signature: SignedAuthorization) -> Self {
        self.pool = Some(signature);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidityReceipt {
    pub shares: u128,
    /// Claim debt left open after claim dust was repaid
    pub claim_debt: u128,
    /// Savings units posted for the owner
    pub collateral_posted: u128,
    pub base_supplied: u128,
    pub base_refunded: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyAndAddReceipt {
    pub shares: u128,
    pub claim_bought: u128,
    pub base_spent_buying: u128,
    pub base_supplied: u128,
    /// Claims the mint did not take, sent to the owner
    pub claim_dust: u128,
    pub base_refunded: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidityReceipt {
    pub base_out: u128,
    pub claim_out: u128,
    /// Claims applied to the debt at face value
    pub claim_repaid: u128,
    /// Base spent settling the rest of the debt
    pub base_repaid: u128,
    pub collateral_withdrawn: u128,
    /// Base paid to the owner
    pub base_paid: u128,
    pub debt_remaining: u128,
}

/// Liquidity proxy over one environment
#[derive(Debug, Clone)]
pub struct PoolProxy {
    address: Address,
    rounding_epsilon: u128,
    solver: SolverSettings,
}

impl PoolProxy {
    pub fn new(address: Address, config: &ProtocolConfig) -> Self {
        Self {
            address,
            rounding_epsilon: config.proxy.rounding_epsilon as u128,
            solver: config.solver.clone(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Provide `base_amount` of liquidity, borrowing the claim side.
    ///
    /// The claim debt is sized at the pool's real reserve proportion and
    /// backed by savings collateral wrapped from the caller's own base.
    pub fn add_liquidity<E: Environment>(
        &self,
        env: &mut E,
        caller: Address,
        pool_id: PoolId,
        base_amount: u128,
        max_claim_debt: u128,
        auths: &Authorizations,
    ) -> ProtocolResult<AddLiquidityReceipt> {
        log_execution!(
            "Adding liquidity to {} with {} base for {:?}",
            pool_id,
            base_amount,
            caller
        );
        if base_amount == 0 {
            return Err(ProtocolError::InvalidAmount {
                reason: "zero base amount",
            });
        }
        let pool = env.pool(pool_id)?.clone();
        let maturity = pool.maturity;
        let auth = env.authorize_position(caller, self.address, auths.ledger.as_ref())?;

        let claim_debt = proportional_claim_debt(&pool, base_amount)?;
        ensure_max_amount(SlippageCheck::MaxClaimDebt, max_claim_debt, claim_debt)?;

        env.transfer_from(self.address, Asset::Base, caller, self.address, base_amount)?;

        // Just enough savings units to back the debt at the current rate
        let chi = env.savings_rate();
        let units = mul_div_up(claim_debt, RAY, chi)?;
        let base_to_wrap = mul_div_up(units, chi, RAY)?;
        let base_for_pool =
            base_amount
                .checked_sub(base_to_wrap)
                .ok_or(ProtocolError::InvalidAmount {
                    reason: "base amount cannot back its own claim debt",
                })?;
        let collateral_posted = env.wrap_savings(self.address, base_to_wrap)?;
        env.post(self.address, LIQUIDITY_COLLATERAL, caller, collateral_posted)?;
        env.borrow(&auth, LIQUIDITY_COLLATERAL, maturity, self.address, claim_debt)?;

        let base_supplied = matching_base(&pool, claim_debt, base_for_pool)?;
        let minted = env.mint_liquidity(self.address, pool_id, caller, base_supplied)?;
        log_pool!(
            "Minted {} shares of {} for {} base and {} claims",
            minted.shares,
            pool_id,
            minted.base_in,
            minted.claim_in
        );

        let claim_dust = env.balance_of(Asset::Claim(maturity), self.address);
        let dust_repaid =
            env.repay_claim(self.address, LIQUIDITY_COLLATERAL, maturity, caller, claim_dust)?;
        let base_refunded = self.pay_out(env, caller)?;

        self.ensure_clean(env, pool_id, maturity)?;
        log_success!(
            "Added liquidity to {}: {} shares, {} claim debt",
            pool_id,
            minted.shares,
            claim_debt - dust_repaid
        );
        Ok(AddLiquidityReceipt {
            shares: minted.shares,
            claim_debt: claim_debt - dust_repaid,
            collateral_posted,
            base_supplied,
            base_refunded,
        })
    }

    /// Provide liquidity by buying the claim side from the pool first.
    ///
    /// Nothing is borrowed or burned for the caller, so the base approval
    /// is the only grant required.
    pub fn buy_and_add_liquidity<E: Environment>(
        &self,
        env: &mut E,
        caller: Address,
        pool_id: PoolId,
        max_base_to_use: u128,
        max_base_in: u128,
    ) -> ProtocolResult<BuyAndAddReceipt> {
        log_execution!(
            "Buying and adding liquidity to {} with up to {} base for {:?}",
            pool_id,
            max_base_to_use,
            caller
        );
        if max_base_to_use == 0 {
            return Err(ProtocolError::InvalidAmount {
                reason: "zero base amount",
            });
        }
        let pool = env.pool(pool_id)?.clone();
        let maturity = pool.maturity;
        let solver = LiquiditySolver::new(env.reserve_math().clone(), self.solver.clone());
        let plan = solver.claim_to_buy_for_mint(
            pool.base_reserves,
            pool.claim_reserves,
            pool.claim_virtual_reserves(),
            max_base_to_use,
            pool.time_to_maturity(env.now())?,
        )?;
        if !plan.converged {
            warn!(
                %pool_id,
                iterations = plan.iterations,
                claim_out = plan.claim_out,
                "Solver hit its iteration cap, using best estimate"
            );
        }

        env.transfer_from(self.address, Asset::Base, caller, self.address, max_base_to_use)?;
        let base_spent_buying = env.buy_claim(self.address, pool_id, plan.claim_out)?;
        let available =
            max_base_to_use
                .checked_sub(base_spent_buying)
                .ok_or(ProtocolError::InsufficientBalance {
                    asset: Asset::Base,
                    account: self.address,
                    required: base_spent_buying,
                    available: max_base_to_use,
                })?;

        let after = env.pool(pool_id)?;
        let base_supplied = matching_base(after, plan.claim_out, available)?;
        let spent = base_spent_buying
            .checked_add(base_supplied)
            .ok_or(ProtocolError::Arithmetic("base spent overflow"))?;
        ensure_max_amount(SlippageCheck::MaxBaseIn, max_base_in, spent)?;

        let minted = env.mint_liquidity(self.address, pool_id, caller, base_supplied)?;
        log_pool!(
            "Bought {} claims for {} base, minted {} shares of {}",
            plan.claim_out,
            base_spent_buying,
            minted.shares,
            pool_id
        );

        let claim_dust = env.balance_of(Asset::Claim(maturity), self.address);
        env.transfer(Asset::Claim(maturity), self.address, caller, claim_dust)?;
        let base_refunded = self.pay_out(env, caller)?;

        self.ensure_clean(env, pool_id, maturity)?;
        log_success!("Bought and added liquidity to {}: {} shares", pool_id, minted.shares);
        Ok(BuyAndAddReceipt {
            shares: minted.shares,
            claim_bought: plan.claim_out,
            base_spent_buying,
            base_supplied,
            claim_dust,
            base_refunded,
        })
    }

    /// Burn shares and settle the debt through the pool.
    ///
    /// `min_claim_price` bounds base received per leftover claim sold.
    /// `min_base_price` bounds claims per base, both for the burned base at
    /// the pool's quote and for any debt bought back.
    pub fn remove_liquidity_by_selling<E: Environment>(
        &self,
        env: &mut E,
        caller: Address,
        pool_id: PoolId,
        shares: u128,
        min_base_price: Decimal,
        min_claim_price: Decimal,
        auths: &Authorizations,
    ) -> ProtocolResult<RemoveLiquidityReceipt> {
        log_execution!("Removing {} shares of {} by selling for {:?}", shares, pool_id, caller);
        let (pool_auth, ledger_auth) = self.authorize_removal(env, caller, pool_id, auths)?;
        let maturity = env.pool(pool_id)?.maturity;

        let burned = env.burn_liquidity(&pool_auth, pool_id, shares, self.address)?;
        if burned.base_out > 0 && !min_base_price.is_zero() {
            let claims = env.quote_sell_base(pool_id, burned.base_out)?;
            ensure_min_price(
                SlippageCheck::MinBasePrice,
                min_base_price,
                ratio(claims, burned.base_out)?,
            )?;
        }
        let claim_repaid = env.repay_claim(
            self.address,
            LIQUIDITY_COLLATERAL,
            maturity,
            caller,
            burned.claim_out,
        )?;
        let leftover = burned.claim_out - claim_repaid;
        if leftover > 0 {
            let base_received = env.sell_claim(self.address, pool_id, leftover)?;
            ensure_min_price(
                SlippageCheck::MinClaimPrice,
                min_claim_price,
                ratio(base_received, leftover)?,
            )?;
        }

        let mut base_repaid = 0;
        let remaining = env.debt_claim(LIQUIDITY_COLLATERAL, maturity, caller);
        if remaining > 0 {
            let held = env.balance_of(Asset::Base, self.address);
            match env.quote_buy_claim(pool_id, remaining) {
                Ok(cost) if cost > 0 && cost < remaining && cost <= held => {
                    ensure_min_price(
                        SlippageCheck::MinBasePrice,
                        min_base_price,
                        ratio(remaining, cost)?,
                    )?;
                    base_repaid = env.buy_claim(self.address, pool_id, remaining)?;
                    env.repay_claim(
                        self.address,
                        LIQUIDITY_COLLATERAL,
                        maturity,
                        caller,
                        remaining,
                    )?;
                }
                _ => {
                    let owed = env.debt_base(LIQUIDITY_COLLATERAL, maturity, caller)?;
                    base_repaid = env.repay_base(
                        self.address,
                        LIQUIDITY_COLLATERAL,
                        maturity,
                        caller,
                        held.min(owed),
                    )?;
                }
            }
        }

        self.finish_removal(env, &ledger_auth, pool_id, maturity, burned, claim_repaid, base_repaid)
    }

    /// Burn shares and repay the debt at face value, selling only what is
    /// left over. `min_base_price` bounds base received per claim sold.
    pub fn remove_liquidity_by_repaying<E: Environment>(
        &self,
        env: &mut E,
        caller: Address,
        pool_id: PoolId,
        shares: u128,
        min_base_price: Decimal,
        auths: &Authorizations,
    ) -> ProtocolResult<RemoveLiquidityReceipt> {
        log_execution!("Removing {} shares of {} by repaying for {:?}", shares, pool_id, caller);
        let (pool_auth, ledger_auth) = self.authorize_removal(env, caller, pool_id, auths)?;
        let maturity = env.pool(pool_id)?.maturity;

        let burned = env.burn_liquidity(&pool_auth, pool_id, shares, self.address)?;
        let claim_repaid = env.repay_claim(
            self.address,
            LIQUIDITY_COLLATERAL,
            maturity,
            caller,
            burned.claim_out,
        )?;
        let base_repaid = self.repay_rest_in_base(env, caller, maturity)?;

        let leftover = burned.claim_out - claim_repaid;
        if leftover > 0 {
            let base_received = env.sell_claim(self.address, pool_id, leftover)?;
            ensure_min_price(
                SlippageCheck::MinBasePrice,
                min_base_price,
                ratio(base_received, leftover)?,
            )?;
        }

        self.finish_removal(env, &ledger_auth, pool_id, maturity, burned, claim_repaid, base_repaid)
    }

    /// Burn shares once the pool has matured, redeeming leftover claims 1:1
    pub fn remove_liquidity_after_maturity<E: Environment>(
        &self,
        env: &mut E,
        caller: Address,
        pool_id: PoolId,
        shares: u128,
        auths: &Authorizations,
    ) -> ProtocolResult<RemoveLiquidityReceipt> {
        log_execution!("Removing {} matured shares of {} for {:?}", shares, pool_id, caller);
        let maturity = env.pool(pool_id)?.maturity;
        let now = env.now();
        if !maturity.has_matured(now) {
            return Err(ProtocolError::NotMatured { maturity, now });
        }
        let (pool_auth, ledger_auth) = self.authorize_removal(env, caller, pool_id, auths)?;

        let burned = env.burn_liquidity(&pool_auth, pool_id, shares, self.address)?;
        let claim_repaid = env.repay_claim(
            self.address,
            LIQUIDITY_COLLATERAL,
            maturity,
            caller,
            burned.claim_out,
        )?;
        let leftover = burned.claim_out - claim_repaid;
        if leftover > 0 {
            env.redeem(self.address, maturity, leftover)?;
        }
        let base_repaid = self.repay_rest_in_base(env, caller, maturity)?;

        self.finish_removal(env, &ledger_auth, pool_id, maturity, burned, claim_repaid, base_repaid)
    }

    /// `(has_direct_approval, has_position_delegate, has_pool_delegate)` for
    /// the proxy acting on `caller`'s behalf
    pub fn check_authorization<E: Environment>(
        &self,
        env: &E,
        pool_id: PoolId,
        caller: Address,
    ) -> ProtocolResult<(bool, bool, bool)> {
        Ok((
            env.is_approved(caller, self.address, Asset::Base),
            env.position_gate().is_delegate(caller, self.address),
            env.pool_gate(pool_id)?.is_delegate(caller, self.address),
        ))
    }

    fn authorize_removal<E: Environment>(
        &self,
        env: &mut E,
        caller: Address,
        pool_id: PoolId,
        auths: &Authorizations,
    ) -> ProtocolResult<(Authorized, Authorized)> {
        let pool_auth = env.authorize_pool(pool_id, caller, self.address, auths.pool.as_ref())?;
        let ledger_auth = env.authorize_position(caller, self.address, auths.ledger.as_ref())?;
        Ok((pool_auth, ledger_auth))
    }

    fn repay_rest_in_base<E: Environment>(
        &self,
        env: &mut E,
        owner: Address,
        maturity: Maturity,
    ) -> ProtocolResult<u128> {
        let owed = env.debt_base(LIQUIDITY_COLLATERAL, maturity, owner)?;
        if owed == 0 {
            return Ok(0);
        }
        let held = env.balance_of(Asset::Base, self.address);
        env.repay_base(self.address, LIQUIDITY_COLLATERAL, maturity, owner, held.min(owed))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_removal<E: Environment>(
        &self,
        env: &mut E,
        ledger_auth: &Authorized,
        pool_id: PoolId,
        maturity: Maturity,
        burned: tenor_amm::BurnQuote,
        claim_repaid: u128,
        base_repaid: u128,
    ) -> ProtocolResult<RemoveLiquidityReceipt> {
        let owner = ledger_auth.owner();
        let collateral_withdrawn = self.release_collateral(env, ledger_auth, maturity)?;
        let base_paid = self.pay_out(env, owner)?;
        let debt_remaining = env.debt_claim(LIQUIDITY_COLLATERAL, maturity, owner);

        self.ensure_clean(env, pool_id, maturity)?;
        log_success!(
            "Removed {} shares of {}: {} base paid, {} debt remaining",
            burned.shares,
            pool_id,
            base_paid,
            debt_remaining
        );
        Ok(RemoveLiquidityReceipt {
            base_out: burned.base_out,
            claim_out: burned.claim_out,
            claim_repaid,
            base_repaid,
            collateral_withdrawn,
            base_paid,
            debt_remaining,
        })
    }

    /// Withdraw and unwrap the owner's free savings collateral once the
    /// debt at `maturity` is cleared
    fn release_collateral<E: Environment>(
        &self,
        env: &mut E,
        auth: &Authorized,
        maturity: Maturity,
    ) -> ProtocolResult<u128> {
        let owner = auth.owner();
        if env.debt_claim(LIQUIDITY_COLLATERAL, maturity, owner) > 0 {
            return Ok(0);
        }
        let units = env.free_collateral(LIQUIDITY_COLLATERAL, owner)?;
        if units == 0 {
            return Ok(0);
        }
        env.withdraw(auth, LIQUIDITY_COLLATERAL, self.address, units)?;
        let base = env.unwrap_savings(self.address, units)?;
        debug!(?owner, units, base, "Savings collateral released");
        Ok(units)
    }

    /// Send the proxy's whole base balance to `to`
    fn pay_out<E: Environment>(&self, env: &mut E, to: Address) -> ProtocolResult<u128> {
        let base = env.balance_of(Asset::Base, self.address);
        env.transfer(Asset::Base, self.address, to, base)?;
        Ok(base)
    }

    fn ensure_clean<E: Environment>(
        &self,
        env: &E,
        pool_id: PoolId,
        maturity: Maturity,
    ) -> ProtocolResult<()> {
        ensure_no_residue(
            env,
            self.address,
            &[
                Asset::Base,
                Asset::Claim(maturity),
                Asset::Shares(pool_id),
                Asset::Collateral(LIQUIDITY_COLLATERAL),
            ],
            self.rounding_epsilon,
        )
    }
}
