//! Protocol constants
//!
//! Defaults for every tunable in [`crate::ProtocolConfig`] plus the
//! fixed-point units shared across the workspace.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Largest balance (in base units) a proxy may hold after any call
pub const ROUNDING_EPSILON: u128 = 100;

/// Subtracted from curve outputs and added to curve inputs, in base units
pub const PRECISION_GUARD: u64 = 1_000_000_000_000;

/// Curve parameters
pub mod curve {
    /// Four years in seconds; `k = 1 / SECONDS_PER_CURVE_PERIOD`
    pub const SECONDS_PER_CURVE_PERIOD: u64 = 126_144_000;

    /// Fee factor `g1` for trades paying base into the pool
    pub const FEE_BASE_IN: (u64, u64) = (950, 1000);

    /// Fee factor `g2` for trades paying claims into the pool
    pub const FEE_CLAIM_IN: (u64, u64) = (1000, 950);
}

/// Bounded bisection used to size buy-then-mint operations
pub mod solver {
    use super::*;

    /// Relative band `ε` around the pool proportion accepted as converged
    pub const SOLVER_TOLERANCE: Decimal = dec!(0.000001);

    /// Iterations before the solver returns its best candidate
    pub const SOLVER_MAX_ITERATIONS: u32 = 10_000;
}

/// Claim flash-mint fee, in basis points of the amount minted
pub const FLASH_FEE_BPS: u32 = 0;
