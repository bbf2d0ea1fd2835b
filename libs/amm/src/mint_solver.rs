//! Buy-then-mint sizing
//!
//! A provider holding only base currency must first buy claims so that the
//! remaining (base, claim) pair matches the pool's post-trade proportion.
//! There is no closed form once the curve is involved, so this runs a
//! bounded bisection and returns its best candidate if the cap is hit.
//!
//! The bracket update deliberately narrows `min` and then `max` within the
//! same iteration, using the already-moved midpoint. Results are expected
//! to be reproducible against that exact sequence.

use crate::ReserveMath;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tenor_config::SolverSettings;
use tenor_types::{to_decimal, ProtocolError, ProtocolResult};
use tracing::debug;

/// Claims to buy before minting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintPlan {
    /// Claims to buy from the pool, floored to base units
    pub claim_out: u128,
    /// Iterations the search ran
    pub iterations: u32,
    /// False when the iteration cap was reached first
    pub converged: bool,
}

/// Bounded bisection over the amount of claims to buy
pub struct LiquiditySolver {
    math: ReserveMath,
    settings: SolverSettings,
}

impl LiquiditySolver {
    pub fn new(math: ReserveMath, settings: SolverSettings) -> Self {
        Self { math, settings }
    }

    /// Size the claim purchase for minting with `total_base` base only.
    ///
    /// Pricing uses the virtual claim reserve; the post-trade proportion uses
    /// the real claim reserve, since that is what a mint must match.
    pub fn claim_to_buy_for_mint(
        &self,
        base_reserves: u128,
        claim_real_reserves: u128,
        claim_virtual_reserves: u128,
        total_base: u128,
        time_to_maturity: u64,
    ) -> ProtocolResult<MintPlan> {
        if time_to_maturity == 0 {
            return Err(ProtocolError::MaturityElapsed);
        }
        if total_base == 0 {
            return Ok(MintPlan {
                claim_out: 0,
                iterations: 0,
                converged: true,
            });
        }

        let z = to_decimal(total_base)?;
        let base_reserves_dec = to_decimal(base_reserves)?;
        let claim_real_dec = to_decimal(claim_real_reserves)?;
        let band = Decimal::ONE + self.settings.tolerance;

        let mut min = Decimal::ZERO;
        let mut max = z;
        let mut y_out = (min + max) / Decimal::TWO;
        let mut iterations = 0u32;

        loop {
            let candidate = floor_amount(y_out)?;
            let quoted = self.math.quote_buy_claim(
                base_reserves,
                claim_virtual_reserves,
                candidate,
                time_to_maturity,
            );

            match quoted {
                Ok(base_in) => {
                    let z_in = to_decimal(base_in)?;
                    let base_after = base_reserves_dec + z_in;
                    let claim_after = claim_real_dec - y_out;
                    let mine = z - z_in;

                    match (
                        mine.checked_div(mine + y_out),
                        base_after.checked_div(base_after + claim_after),
                    ) {
                        (Some(pz), Some(pool_pz)) => {
                            if pool_pz * band <= pz {
                                min = y_out;
                            }
                            y_out = (y_out + max) / Decimal::TWO;
                            if pz <= pool_pz {
                                max = y_out;
                            }
                            y_out = (y_out + min) / Decimal::TWO;

                            if pool_pz * band > pz && pz > pool_pz {
                                debug!(iterations, %y_out, "Mint solver converged");
                                return Ok(MintPlan {
                                    claim_out: floor_amount(y_out)?,
                                    iterations,
                                    converged: true,
                                });
                            }
                        }
                        _ => {
                            max = y_out;
                            y_out = (y_out + min) / Decimal::TWO;
                        }
                    }
                }
                // The candidate is beyond what the curve can price
                Err(ProtocolError::InsufficientLiquidity { .. }) => {
                    max = y_out;
                    y_out = (y_out + min) / Decimal::TWO;
                }
                Err(e) => return Err(e),
            }

            if iterations >= self.settings.max_iterations {
                debug!(iterations, %y_out, "Mint solver hit iteration cap");
                return Ok(MintPlan {
                    claim_out: floor_amount(y_out)?,
                    iterations,
                    converged: false,
                });
            }
            iterations += 1;
        }
    }
}

fn floor_amount(value: Decimal) -> ProtocolResult<u128> {
    value
        .floor()
        .to_u128()
        .ok_or(ProtocolError::Arithmetic("solver candidate out of range"))
}
