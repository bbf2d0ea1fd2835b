//! # Tenor Types
//!
//! Shared vocabulary for the Tenor workspace: typed identifiers for pools,
//! maturities and foreign vaults, the [`Asset`] enum every balance is keyed
//! by, fixed-point helpers for WAD/RAY arithmetic and the [`ProtocolError`]
//! taxonomy returned by every fallible operation.
//!
//! ## Design Philosophy
//!
//! - **Integer amounts**: every balance is a `u128` in base units (1 token = 10^18)
//! - **Wide intermediates**: products go through `U256` so `amount × RAY` never overflows
//! - **Typed identifiers**: a `PoolId` cannot be passed where a `VaultHandle` is expected
//! - **Explicit failures**: one error enum, fail-fast, no panics on user input

pub mod asset;
pub mod errors;
pub mod identifiers;
pub mod math;

pub use asset::{Asset, Collateral};
pub use errors::{ProtocolError, ProtocolResult, SlippageCheck};
pub use identifiers::{Maturity, PoolId, VaultHandle};
pub use math::{mul_div, mul_div_up, ratio, to_decimal, RAY, WAD};

pub use ethers_core::types::{Address, H256, U256};
