//! Fixed-yield bonding curve math
//!
//! Quotes for the four trades a pool supports. `Z` is the base reserve, `Y`
//! the *virtual* claim reserve and `t` the seconds left to maturity. With
//! `k = 1 / time_stretch_seconds` and fee factor `g`, the invariant exponent
//! is `a = 1 − g·k·t`.

use tenor_config::CurveSettings;
use tenor_types::{ProtocolError, ProtocolResult};

/// Bonding curve quotes with rounding in the pool's favor
#[derive(Debug, Clone)]
pub struct ReserveMath {
    time_stretch_seconds: f64,
    fee_base_in: f64,
    fee_claim_in: f64,
    precision_guard: u128,
}

impl Default for ReserveMath {
    fn default() -> Self {
        Self::new(&CurveSettings::default())
    }
}

impl ReserveMath {
    pub fn new(settings: &CurveSettings) -> Self {
        Self {
            time_stretch_seconds: settings.time_stretch_seconds as f64,
            fee_base_in: settings.fee_base_in.as_f64(),
            fee_claim_in: settings.fee_claim_in.as_f64(),
            precision_guard: settings.precision_guard as u128,
        }
    }

    /// Invariant exponent `a = 1 − g·k·t`
    ///
    /// Fails with `MaturityElapsed` at `t = 0`; the curve is not used for
    /// matured claims, which redeem 1:1 instead.
    pub fn exponent(&self, time_to_maturity: u64, fee: f64) -> ProtocolResult<f64> {
        if time_to_maturity == 0 {
            return Err(ProtocolError::MaturityElapsed);
        }
        let a = 1.0 - fee * time_to_maturity as f64 / self.time_stretch_seconds;
        if !(a > 0.0) {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "time to maturity beyond curve horizon",
            });
        }
        Ok(a)
    }

    /// Claims out for `base_in` base sold into the pool
    pub fn quote_sell_base(
        &self,
        base_reserves: u128,
        claim_reserves: u128,
        base_in: u128,
        time_to_maturity: u64,
    ) -> ProtocolResult<u128> {
        let a = self.exponent(time_to_maturity, self.fee_base_in)?;
        if base_in == 0 {
            return Ok(0);
        }

        let (z, y, x) = (base_reserves as f64, claim_reserves as f64, base_in as f64);
        let sum = z.powf(a) + y.powf(a) - (z + x).powf(a);
        if sum < 0.0 {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "too much base in",
            });
        }

        let claim_out = self.round_output(y - sum.powf(1.0 / a))?;
        if claim_out > claim_reserves {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "claim out exceeds reserves",
            });
        }
        Self::ensure_positive_rate(base_reserves, claim_reserves, base_in, claim_out)?;
        Ok(claim_out)
    }

    /// Base out for `claim_in` claims sold into the pool
    pub fn quote_sell_claim(
        &self,
        base_reserves: u128,
        claim_reserves: u128,
        claim_in: u128,
        time_to_maturity: u64,
    ) -> ProtocolResult<u128> {
        let a = self.exponent(time_to_maturity, self.fee_claim_in)?;
        if claim_in == 0 {
            return Ok(0);
        }

        let (z, y, dy) = (base_reserves as f64, claim_reserves as f64, claim_in as f64);
        let sum = z.powf(a) + y.powf(a) - (y + dy).powf(a);
        if sum < 0.0 {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "too much claim in",
            });
        }

        let base_out = self.round_output(z - sum.powf(1.0 / a))?;
        if base_out > base_reserves {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "base out exceeds reserves",
            });
        }
        Ok(base_out)
    }

    /// Claims in required to take exactly `base_out` base from the pool
    pub fn quote_buy_base(
        &self,
        base_reserves: u128,
        claim_reserves: u128,
        base_out: u128,
        time_to_maturity: u64,
    ) -> ProtocolResult<u128> {
        let a = self.exponent(time_to_maturity, self.fee_claim_in)?;
        if base_out == 0 {
            return Ok(0);
        }
        if base_out > base_reserves {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "too much base out",
            });
        }

        let (z, y, x) = (base_reserves as f64, claim_reserves as f64, base_out as f64);
        let sum = z.powf(a) + y.powf(a) - (z - x).powf(a);
        self.round_input(sum.powf(1.0 / a) - y)
    }

    /// Base in required to take exactly `claim_out` claims from the pool
    pub fn quote_buy_claim(
        &self,
        base_reserves: u128,
        claim_reserves: u128,
        claim_out: u128,
        time_to_maturity: u64,
    ) -> ProtocolResult<u128> {
        let a = self.exponent(time_to_maturity, self.fee_base_in)?;
        if claim_out == 0 {
            return Ok(0);
        }
        if claim_out > claim_reserves {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "too much claim out",
            });
        }

        let (z, y, dy) = (base_reserves as f64, claim_reserves as f64, claim_out as f64);
        let sum = z.powf(a) + y.powf(a) - (y - dy).powf(a);
        let base_in = self.round_input(sum.powf(1.0 / a) - z)?;
        Self::ensure_positive_rate(base_reserves, claim_reserves, base_in, claim_out)?;
        Ok(base_in)
    }

    /// Claims taken out must leave the claim reserve at or above the base
    /// reserve, otherwise the implied interest rate would go negative.
    fn ensure_positive_rate(
        base_reserves: u128,
        claim_reserves: u128,
        base_in: u128,
        claim_out: u128,
    ) -> ProtocolResult<()> {
        let claim_after = claim_reserves.saturating_sub(claim_out);
        let base_after = base_reserves.saturating_add(base_in);
        if claim_after < base_after {
            return Err(ProtocolError::InsufficientLiquidity {
                reason: "claim reserves too low",
            });
        }
        Ok(())
    }

    fn round_output(&self, value: f64) -> ProtocolResult<u128> {
        let floored = to_amount(value.floor())?;
        Ok(floored.saturating_sub(self.precision_guard))
    }

    fn round_input(&self, value: f64) -> ProtocolResult<u128> {
        to_amount(value.ceil())?
            .checked_add(self.precision_guard)
            .ok_or(ProtocolError::Arithmetic("curve input overflow"))
    }
}

fn to_amount(value: f64) -> ProtocolResult<u128> {
    if !value.is_finite() {
        return Err(ProtocolError::InsufficientLiquidity {
            reason: "curve evaluation diverged",
        });
    }
    if value <= 0.0 {
        return Ok(0);
    }
    Ok(value as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tenor_types::WAD;

    const SIX_MONTHS: u64 = 15_778_476;
    const ONE_YEAR: u64 = 31_556_952;

    fn reserves() -> (u128, u128) {
        (1_000 * WAD, 1_034_400 * WAD / 1_000)
    }

    #[test]
    fn test_claims_trade_at_a_discount_before_maturity() {
        let math = ReserveMath::default();
        let (z, y) = reserves();

        let claim_out = math.quote_sell_base(z, y, WAD, SIX_MONTHS).unwrap();
        assert!(claim_out > WAD, "one base buys more than one claim");

        let base_out = math.quote_sell_claim(z, y, WAD, SIX_MONTHS).unwrap();
        assert!(base_out < WAD, "one claim sells for less than one base");
    }

    #[test]
    fn test_price_converges_to_par_near_maturity() {
        let math = ReserveMath::default();
        let (z, y) = reserves();

        let far = math.quote_sell_base(z, y, WAD, ONE_YEAR).unwrap();
        let near = math.quote_sell_base(z, y, WAD, 3_600).unwrap();
        assert!(near < far);
        // An hour out, the claim is within a basis point of par
        assert!(near.abs_diff(WAD) < WAD / 10_000);
    }

    #[test]
    fn test_buy_quotes_cover_sell_quotes() {
        let math = ReserveMath::default();
        let (z, y) = reserves();

        let claim_out = 2 * WAD;
        let base_in = math.quote_buy_claim(z, y, claim_out, SIX_MONTHS).unwrap();
        let claims_for_base_in = math.quote_sell_base(z, y, base_in, SIX_MONTHS).unwrap();
        // Paying the buy quote buys back at least what was asked for, less the guard
        assert!(claims_for_base_in + 2 * 1_000_000_000_000 >= claim_out);

        let base_out = 2 * WAD;
        let claim_in = math.quote_buy_base(z, y, base_out, SIX_MONTHS).unwrap();
        assert!(claim_in > base_out);
    }

    #[test]
    fn test_matured_pool_cannot_quote() {
        let math = ReserveMath::default();
        let (z, y) = reserves();

        assert_eq!(
            math.quote_buy_claim(z, y, WAD, 0),
            Err(ProtocolError::MaturityElapsed)
        );
        assert_eq!(
            math.quote_sell_claim(z, y, WAD, 0),
            Err(ProtocolError::MaturityElapsed)
        );
    }

    #[test]
    fn test_negative_rate_is_rejected() {
        let math = ReserveMath::default();
        // Freshly initialized pool: virtual claims equal base reserves
        let z = 1_000 * WAD;
        let result = math.quote_sell_base(z, z, WAD, SIX_MONTHS);
        assert!(matches!(
            result,
            Err(ProtocolError::InsufficientLiquidity { .. })
        ));
        let result = math.quote_buy_claim(z, z, WAD, SIX_MONTHS);
        assert!(matches!(
            result,
            Err(ProtocolError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_oversized_outputs_are_rejected() {
        let math = ReserveMath::default();
        let (z, y) = reserves();

        assert!(matches!(
            math.quote_buy_base(z, y, z + 1, SIX_MONTHS),
            Err(ProtocolError::InsufficientLiquidity { .. })
        ));
        assert!(matches!(
            math.quote_buy_claim(z, y, y + 1, SIX_MONTHS),
            Err(ProtocolError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_horizon_beyond_curve_is_rejected() {
        let math = ReserveMath::default();
        let (z, y) = reserves();
        // g2·k·t ≥ 1 past roughly 3.8 years
        let result = math.quote_sell_claim(z, y, WAD, 4 * ONE_YEAR);
        assert!(matches!(
            result,
            Err(ProtocolError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_zero_amounts_quote_zero() {
        let math = ReserveMath::default();
        let (z, y) = reserves();
        assert_eq!(math.quote_buy_claim(z, y, 0, SIX_MONTHS), Ok(0));
        assert_eq!(math.quote_sell_base(z, y, 0, SIX_MONTHS), Ok(0));
    }

    proptest! {
        #[test]
        fn prop_round_trip_never_profits(amount in 1_000_000_000_000_000u128..10 * WAD) {
            let math = ReserveMath::default();
            let (z, y) = reserves();

            let claim_out = math.quote_sell_base(z, y, amount, SIX_MONTHS).unwrap();
            let base_back = math
                .quote_sell_claim(z + amount, y - claim_out, claim_out, SIX_MONTHS)
                .unwrap();
            prop_assert!(base_back <= amount);
        }
    }
}
