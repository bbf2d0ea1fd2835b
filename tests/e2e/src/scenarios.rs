//! End-to-end test scenarios

pub mod liquidity_lifecycle;
pub mod migration_round_trip;
pub mod roll_to_maturity;

pub use liquidity_lifecycle::LiquidityLifecycle;
pub use migration_round_trip::MigrationRoundTrip;
pub use roll_to_maturity::RollToMaturity;
