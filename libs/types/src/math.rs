//! Fixed-point helpers
//!
//! Amounts are `u128` base units. Intermediate products are widened to
//! `U256` so that scaling by `RAY` cannot overflow; the result is narrowed
//! back to `u128` or reported as an arithmetic failure.

use crate::{ProtocolError, ProtocolResult, U256};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// 10^18, one whole token
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// 10^27, unit for rates and exchange indices
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// `a × b / denominator`, rounded down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> ProtocolResult<u128> {
    if denominator == 0 {
        return Err(ProtocolError::Arithmetic("division by zero"));
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(denominator))
}

/// `a × b / denominator`, rounded up
pub fn mul_div_up(a: u128, b: u128, denominator: u128) -> ProtocolResult<u128> {
    if denominator == 0 {
        return Err(ProtocolError::Arithmetic("division by zero"));
    }
    let (quotient, remainder) = (U256::from(a) * U256::from(b)).div_mod(U256::from(denominator));
    if remainder.is_zero() {
        narrow(quotient)
    } else {
        narrow(quotient + U256::one())
    }
}

/// Lossless conversion of an amount into a `Decimal`
pub fn to_decimal(amount: u128) -> ProtocolResult<Decimal> {
    Decimal::from_u128(amount).ok_or(ProtocolError::Arithmetic("amount exceeds decimal range"))
}

/// `numerator / denominator` as a `Decimal` price
pub fn ratio(numerator: u128, denominator: u128) -> ProtocolResult<Decimal> {
    to_decimal(numerator)?
        .checked_div(to_decimal(denominator)?)
        .ok_or(ProtocolError::Arithmetic("price ratio undefined"))
}

fn narrow(value: U256) -> ProtocolResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(ProtocolError::Arithmetic("result exceeds u128"));
    }
    Ok(value.as_u128())
}
