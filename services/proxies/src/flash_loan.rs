//! Base currency flash loans served through a pool
//!
//! The lender flash-mints claims, sells them for exactly the loan, and buys
//! them back out of what the borrower returns. The fee is whatever that
//! round trip through the curve costs, plus the claim flash fee.

use crate::flash_guard::verify_flash_callback;
use crate::residue::ensure_no_residue;
use crate::{log_execution, log_flash, log_success};
use tenor_amm::{CurvePool, TradeKind};
use tenor_config::ProtocolConfig;
use tenor_ledger::{Environment, FlashBorrower, FlashRequest};
use tenor_types::{Address, Asset, PoolId, ProtocolError, ProtocolResult};

/// Receives a base loan and must leave `loan + fee` approved to the lender
pub trait BaseFlashBorrower<E: ?Sized> {
    fn address(&self) -> Address;

    fn on_base_loan(
        &mut self,
        env: &mut E,
        lender: Address,
        loan: u128,
        fee: u128,
        data: &[u8],
    ) -> ProtocolResult<()>;
}

#[derive(Debug, Clone)]
pub struct BaseFlashLender {
    address: Address,
    pool: PoolId,
    rounding_epsilon: u128,
}

impl BaseFlashLender {
    pub fn new(address: Address, pool: PoolId, config: &ProtocolConfig) -> Self {
        Self {
            address,
            pool,
            rounding_epsilon: config.proxy.rounding_epsilon as u128,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// Base charged on top of `loan`: buying the flashed claims back on the
    /// post-sale reserves costs more than the sale raised
    pub fn flash_fee<E: Environment>(&self, env: &E, loan: u128) -> ProtocolResult<u128> {
        let (math, now) = (env.reserve_math(), env.now());
        let mut state = env.pool(self.pool)?.clone();
        let sale = state.quote(math, now, TradeKind::BuyBase, loan)?;
        state.apply_swap(&sale)?;

        let claims = sale.claim_in();
        let owed = claims
            .checked_add(env.flash_fee(claims)?)
            .ok_or(ProtocolError::Arithmetic("flash debt overflow"))?;
        let buy_back = state.quote(math, now, TradeKind::BuyClaim, owed)?;
        Ok(buy_back.base_in().saturating_sub(loan))
    }

    /// Lend `loan` base to `borrower` for the duration of its callback,
    /// returning the fee charged
    pub fn flash_loan<E, B>(
        &self,
        env: &mut E,
        borrower: &mut B,
        loan: u128,
        data: &[u8],
    ) -> ProtocolResult<u128>
    where
        E: Environment,
        B: BaseFlashBorrower<E> + ?Sized,
    {
        log_execution!("Base flash loan of {} through {}", loan, self.pool);
        if loan == 0 {
            return Err(ProtocolError::InvalidAmount {
                reason: "zero loan",
            });
        }
        let fee = self.flash_fee(env, loan)?;
        let claims = env.quote_buy_base(self.pool, loan)?;
        let maturity = env.pool(self.pool)?.maturity;

        let mut handler = BaseLoan {
            lender: self,
            borrower,
            loan,
            fee,
            data,
        };
        env.flash_mint(self.pool, claims, &mut handler)?;

        ensure_no_residue(
            env,
            self.address,
            &[Asset::Base, Asset::Claim(maturity)],
            self.rounding_epsilon,
        )?;
        log_success!("Base flash loan of {} repaid with fee {}", loan, fee);
        Ok(fee)
    }
}

/// Claim flash mint driving one base loan
struct BaseLoan<'a, B: ?Sized> {
    lender: &'a BaseFlashLender,
    borrower: &'a mut B,
    loan: u128,
    fee: u128,
    data: &'a [u8],
}

impl<E, B> FlashBorrower<E> for BaseLoan<'_, B>
where
    E: Environment,
    B: BaseFlashBorrower<E> + ?Sized,
{
    fn flash_address(&self) -> Address {
        self.lender.address
    }

    fn on_flash_loan(
        &mut self,
        env: &mut E,
        lender: Address,
        request: &FlashRequest,
    ) -> ProtocolResult<()> {
        let (address, pool) = (self.lender.address, self.lender.pool);
        verify_flash_callback(env, address, pool, lender, request)?;

        env.buy_base(address, pool, self.loan)?;
        let to = self.borrower.address();
        env.transfer(Asset::Base, address, to, self.loan)?;
        log_flash!("Lent {} base to {:?}", self.loan, to);

        self.borrower
            .on_base_loan(env, address, self.loan, self.fee, self.data)?;

        let owed = self.loan + self.fee;
        let held = env.balance_of(Asset::Base, to);
        if held < owed {
            return Err(ProtocolError::InsufficientProceeds { owed, held });
        }
        env.transfer_from(address, Asset::Base, to, address, owed)?;
        env.buy_claim(address, pool, request.owed())?;

        // Trades inside the callback can leave the buy-back cheaper
        let change = env.balance_of(Asset::Base, address);
        env.transfer(Asset::Base, address, to, change)
    }
}
