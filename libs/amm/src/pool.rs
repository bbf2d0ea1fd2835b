//! Pool state and reserve accounting
//!
//! The pool prices against a *virtual* claim reserve equal to the real
//! claim balance plus the outstanding liquidity shares. That keeps the
//! implied rate finite before any real claims are deposited.

use crate::{CurvePool, PoolReserves, ReserveMath, SwapFill, TradeKind};
use serde::{Deserialize, Serialize};
use tenor_types::{mul_div, Address, Maturity, PoolId, ProtocolError, ProtocolResult};

/// Reserves and share supply of one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub id: PoolId,
    pub maturity: Maturity,
    /// Account holding the reserves
    pub address: Address,
    /// Issuer of the claim this pool trades, which is also its flash lender
    pub claim_token: Address,
    pub base_reserves: u128,
    /// Claims actually held by the pool
    pub claim_reserves: u128,
    pub total_shares: u128,
}

/// Outcome of a mint preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintQuote {
    pub shares: u128,
    pub base_in: u128,
    pub claim_in: u128,
}

/// Outcome of a burn preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnQuote {
    pub shares: u128,
    pub base_out: u128,
    pub claim_out: u128,
}

impl PoolState {
    pub fn new(id: PoolId, maturity: Maturity, address: Address, claim_token: Address) -> Self {
        Self {
            id,
            maturity,
            address,
            claim_token,
            base_reserves: 0,
            claim_reserves: 0,
            total_shares: 0,
        }
    }

    pub fn claim_virtual_reserves(&self) -> u128 {
        self.claim_reserves.saturating_add(self.total_shares)
    }

    /// Seconds left to maturity, failing once matured
    pub fn time_to_maturity(&self, now: u64) -> ProtocolResult<u64> {
        if self.maturity.has_matured(now) {
            return Err(ProtocolError::MaturityElapsed);
        }
        Ok(self.maturity.seconds_until(now))
    }

    /// Shares and assets for depositing `base_offered` base.
    ///
    /// The first deposit is base only and issues one share per unit of base.
    /// Later deposits take claims in proportion to the real claim reserve.
    pub fn preview_mint(&self, base_offered: u128) -> ProtocolResult<MintQuote> {
        if base_offered == 0 {
            return Err(ProtocolError::InvalidAmount {
                reason: "mint of zero base",
            });
        }
        if self.total_shares == 0 {
            return Ok(MintQuote {
                shares: base_offered,
                base_in: base_offered,
                claim_in: 0,
            });
        }
        if self.base_reserves == 0 {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "pool holds no base",
            });
        }

        let shares = mul_div(self.total_shares, base_offered, self.base_reserves)?;
        let claim_in = mul_div(self.claim_reserves, shares, self.total_shares)?;
        Ok(MintQuote {
            shares,
            base_in: base_offered,
            claim_in,
        })
    }

    pub fn apply_mint(&mut self, quote: &MintQuote) {
        self.base_reserves += quote.base_in;
        self.claim_reserves += quote.claim_in;
        self.total_shares += quote.shares;
    }

    /// Pro-rata reserves for burning `shares`
    pub fn preview_burn(&self, shares: u128) -> ProtocolResult<BurnQuote> {
        if shares == 0 || shares > self.total_shares {
            return Err(ProtocolError::InvalidAmount {
                reason: "burn exceeds share supply",
            });
        }
        Ok(BurnQuote {
            shares,
            base_out: mul_div(shares, self.base_reserves, self.total_shares)?,
            claim_out: mul_div(shares, self.claim_reserves, self.total_shares)?,
        })
    }

    pub fn apply_burn(&mut self, quote: &BurnQuote) {
        self.base_reserves -= quote.base_out;
        self.claim_reserves -= quote.claim_out;
        self.total_shares -= quote.shares;
    }

    /// Move reserves according to a priced trade
    pub fn apply_swap(&mut self, fill: &SwapFill) -> ProtocolResult<()> {
        let base = (self.base_reserves + fill.base_in())
            .checked_sub(fill.base_out())
            .ok_or(ProtocolError::InsufficientLiquidity {
                reason: "base reserves exhausted",
            })?;
        let claim = (self.claim_reserves + fill.claim_in())
            .checked_sub(fill.claim_out())
            .ok_or(ProtocolError::InsufficientLiquidity {
                reason: "claim reserves exhausted",
            })?;
        self.base_reserves = base;
        self.claim_reserves = claim;
        Ok(())
    }

    /// Shares exist exactly when reserves do
    pub fn check_invariants(&self) -> ProtocolResult<()> {
        let empty = self.base_reserves == 0 && self.claim_reserves == 0;
        if (self.total_shares == 0) != empty {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "share supply out of sync with reserves",
            });
        }
        Ok(())
    }
}

impl CurvePool for PoolState {
    fn reserves(&self) -> PoolReserves {
        PoolReserves {
            base: self.base_reserves,
            claim_real: self.claim_reserves,
            claim_virtual: self.claim_virtual_reserves(),
        }
    }

    fn maturity(&self) -> Maturity {
        self.maturity
    }

    fn quote(
        &self,
        math: &ReserveMath,
        now: u64,
        kind: TradeKind,
        amount: u128,
    ) -> ProtocolResult<SwapFill> {
        let t = self.time_to_maturity(now)?;
        let (z, y) = (self.base_reserves, self.claim_virtual_reserves());

        let counter_amount = match kind {
            TradeKind::SellBase => math.quote_sell_base(z, y, amount, t)?,
            TradeKind::BuyBase => math.quote_buy_base(z, y, amount, t)?,
            TradeKind::SellClaim => math.quote_sell_claim(z, y, amount, t)?,
            TradeKind::BuyClaim => math.quote_buy_claim(z, y, amount, t)?,
        };
        let fill = SwapFill {
            kind,
            amount,
            counter_amount,
        };

        if fill.claim_out() > self.claim_reserves {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "not enough real claims in pool",
            });
        }
        Ok(fill)
    }
}
