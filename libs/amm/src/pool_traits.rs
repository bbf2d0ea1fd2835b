//! Pool trait definitions for the fixed-yield venue

use crate::ReserveMath;
use serde::{Deserialize, Serialize};
use tenor_types::{Maturity, ProtocolResult};

/// The four trades a pool supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    /// Exact base in, claims out
    SellBase,
    /// Exact base out, claims in
    BuyBase,
    /// Exact claims in, base out
    SellClaim,
    /// Exact claims out, base in
    BuyClaim,
}

/// Snapshot of a pool's reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReserves {
    pub base: u128,
    pub claim_real: u128,
    pub claim_virtual: u128,
}

/// Result of pricing a trade: the exact amount named by the caller and the
/// counter amount the curve produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapFill {
    pub kind: TradeKind,
    pub amount: u128,
    pub counter_amount: u128,
}

impl SwapFill {
    /// Base the trader pays into the pool
    pub fn base_in(&self) -> u128 {
        match self.kind {
            TradeKind::SellBase => self.amount,
            TradeKind::BuyClaim => self.counter_amount,
            _ => 0,
        }
    }

    /// Base the trader takes from the pool
    pub fn base_out(&self) -> u128 {
        match self.kind {
            TradeKind::BuyBase => self.amount,
            TradeKind::SellClaim => self.counter_amount,
            _ => 0,
        }
    }

    /// Claims the trader pays into the pool
    pub fn claim_in(&self) -> u128 {
        match self.kind {
            TradeKind::SellClaim => self.amount,
            TradeKind::BuyBase => self.counter_amount,
            _ => 0,
        }
    }

    /// Claims the trader takes from the pool
    pub fn claim_out(&self) -> u128 {
        match self.kind {
            TradeKind::BuyClaim => self.amount,
            TradeKind::SellBase => self.counter_amount,
            _ => 0,
        }
    }
}

/// Unified interface for curve-priced pools
pub trait CurvePool {
    /// Current reserves, with the virtual claim reserve used for pricing
    fn reserves(&self) -> PoolReserves;

    /// Maturity of the claim this pool trades
    fn maturity(&self) -> Maturity;

    /// Price a trade without mutating the pool
    fn quote(
        &self,
        math: &ReserveMath,
        now: u64,
        kind: TradeKind,
        amount: u128,
    ) -> ProtocolResult<SwapFill>;
}
