//! Error taxonomy for every Tenor operation
//!
//! All failures are fatal to the atomic unit they occur in; nothing here is
//! retried internally. Callers adjust parameters or re-authorize and retry.

use crate::{Address, Asset, Collateral, Maturity, PoolId, VaultHandle};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Which caller-supplied bound a slippage failure tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlippageCheck {
    /// Claim debt opened by an add-liquidity call
    MaxClaimDebt,
    /// Total base currency spent by a buy-and-add call
    MaxBaseIn,
    /// Claims received per unit of base sold
    MinBasePrice,
    /// Base received per claim sold
    MinClaimPrice,
    /// New debt opened at the destination maturity of a roll
    MaxRollDebt,
}

impl fmt::Display for SlippageCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlippageCheck::MaxClaimDebt => "max claim debt",
            SlippageCheck::MaxBaseIn => "max base in",
            SlippageCheck::MinBasePrice => "min base price",
            SlippageCheck::MinClaimPrice => "min claim price",
            SlippageCheck::MaxRollDebt => "max roll debt",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{delegate:?} is not authorized to act for {owner:?}")]
    NotAuthorized { owner: Address, delegate: Address },

    #[error("Authorization expired at {expiry} (now {now})")]
    AuthorizationExpired { expiry: u64, now: u64 },

    #[error("Invalid nonce: expected {expected}, got {provided}")]
    InvalidNonce { expected: u64, provided: u64 },

    #[error("Slippage exceeded on {check}: limit {limit}, actual {actual}")]
    SlippageExceeded {
        check: SlippageCheck,
        limit: Decimal,
        actual: Decimal,
    },

    #[error("Maximum price exceeded: limit {limit}, quoted {quoted}")]
    MaxPriceExceeded { limit: Decimal, quoted: Decimal },

    #[error("Insufficient liquidity: {reason}")]
    InsufficientLiquidity { reason: &'static str },

    #[error("Not enough debt in foreign vault: requested {requested}, available {available}")]
    InsufficientForeignDebt { requested: u128, available: u128 },

    #[error("Not enough collateral in foreign vault: requested {requested}, available {available}")]
    InsufficientForeignCollateral { requested: u128, available: u128 },

    #[error("Not enough local debt: requested {requested}, available {available}")]
    InsufficientLocalDebt { requested: u128, available: u128 },

    #[error("Not enough local collateral: requested {requested}, available {available}")]
    InsufficientLocalCollateral { requested: u128, available: u128 },

    #[error("Maturity has elapsed")]
    MaturityElapsed,

    #[error("{maturity} not reached (now {now})")]
    NotMatured { maturity: Maturity, now: u64 },

    #[error("Unauthorized flash callback: {reason}")]
    UnauthorizedCallback { reason: &'static str },

    #[error("Insufficient proceeds to repay flash loan: owed {owed}, held {held}")]
    InsufficientProceeds { owed: u128, held: u128 },

    #[error("Insufficient {asset} balance for {account:?}: required {required}, available {available}")]
    InsufficientBalance {
        asset: Asset,
        account: Address,
        required: u128,
        available: u128,
    },

    #[error("Position of {owner:?} would be undercollateralized in {collateral}")]
    Undercollateralized { owner: Address, collateral: Collateral },

    #[error("Unknown pool {0}")]
    UnknownPool(PoolId),

    #[error("Unknown vault {0}")]
    UnknownVault(VaultHandle),

    #[error("Residue of {amount} {asset} left in {holder:?} exceeds {limit}")]
    ResidueExceeded {
        asset: Asset,
        holder: Address,
        amount: u128,
        limit: u128,
    },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: &'static str },

    #[error("Arithmetic failure: {0}")]
    Arithmetic(&'static str),

    #[error("State snapshot failure: {0}")]
    Snapshot(String),
}
