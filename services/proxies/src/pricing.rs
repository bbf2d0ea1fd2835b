//! Price bounds and proportional sizing shared by the proxies

use rust_decimal::Decimal;
use tenor_amm::PoolState;
use tenor_types::{mul_div, to_decimal, ProtocolError, ProtocolResult, SlippageCheck};

/// Claim debt matching `base_amount` at the pool's real reserve proportion:
/// `base × Yr / (Z + Yr)`
pub fn proportional_claim_debt(pool: &PoolState, base_amount: u128) -> ProtocolResult<u128> {
    let total = pool
        .base_reserves
        .checked_add(pool.claim_reserves)
        .ok_or(ProtocolError::Arithmetic("reserve overflow"))?;
    if total == 0 {
        return Ok(0);
    }
    mul_div(base_amount, pool.claim_reserves, total)
}

/// Base that pairs with `claims` at the pool's real reserve proportion
pub fn matching_base(pool: &PoolState, claims: u128, available: u128) -> ProtocolResult<u128> {
    if pool.claim_reserves == 0 {
        return Ok(available);
    }
    Ok(available.min(mul_div(claims, pool.base_reserves, pool.claim_reserves)?))
}

/// Realized price must not fall below the caller's minimum
pub fn ensure_min_price(check: SlippageCheck, limit: Decimal, actual: Decimal) -> ProtocolResult<()> {
    if actual < limit {
        return Err(ProtocolError::SlippageExceeded {
            check,
            limit,
            actual,
        });
    }
    Ok(())
}

/// Amount must not exceed the caller's ceiling
pub fn ensure_max_amount(check: SlippageCheck, limit: u128, actual: u128) -> ProtocolResult<()> {
    if actual > limit {
        return Err(ProtocolError::SlippageExceeded {
            check,
            limit: to_decimal(limit)?,
            actual: to_decimal(actual)?,
        });
    }
    Ok(())
}

/// Quoted price must not exceed the caller's ceiling
pub fn ensure_max_price(limit: Decimal, quoted: Decimal) -> ProtocolResult<()> {
    if quoted > limit {
        return Err(ProtocolError::MaxPriceExceeded { limit, quoted });
    }
    Ok(())
}
