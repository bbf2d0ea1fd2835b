//! # Tenor AMM Library - Fixed-Yield Curve Mathematics
//!
//! ## Purpose
//!
//! Pricing and reserve accounting for pools that trade a base currency
//! against a maturity-dated claim. The curve is a constant-power invariant
//! `Z^a + Y^a = const` whose exponent `a = 1 − g·k·t` approaches 1 as the
//! claim approaches maturity, so the claim converges to par.
//!
//! ## Integration Points
//!
//! - **Input Sources**: pool reserves and the market clock, curve settings from `tenor-config`
//! - **Output Destinations**: the in-memory market's trade execution, the proxies' sizing logic
//! - **Rounding**: every quote favors the pool; inputs round up, outputs round down
//!
//! ## Architecture Role
//!
//! ```text
//!  CurveSettings ──► ReserveMath ──► PoolState (previews, mint, burn)
//!                        │
//!                        └──────────► LiquiditySolver ──► MintPlan
//! ```
//!
//! ## Precision Profile
//!
//! - **Amounts**: `u128` base units in, `u128` base units out
//! - **Power terms**: evaluated in `f64`, since fractional exponents have no exact decimal form
//! - **Guard**: a fixed precision guard (10^12 units by default) absorbs float error
//! - **Solver proportions**: `Decimal` arithmetic, 28 significant digits

pub mod mint_solver;
pub mod pool;
pub mod pool_traits;
pub mod reserve_math;

pub use mint_solver::{LiquiditySolver, MintPlan};
pub use pool::{BurnQuote, MintQuote, PoolState};
pub use pool_traits::{CurvePool, PoolReserves, SwapFill, TradeKind};
pub use reserve_math::ReserveMath;

/// Common types for curve calculations
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
