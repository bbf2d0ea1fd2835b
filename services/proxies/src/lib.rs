//! # Tenor Proxies - Atomic Liquidity, Roll and Migration Orchestration
//!
//! ## Purpose
//!
//! Multi-step operations that a user runs as a single unit against the
//! collaborators in `tenor-ledger`: providing and removing pool liquidity
//! with borrowed claims, rolling debt between maturities, migrating a
//! position to and from the foreign ledger, and base flash loans.
//!
//! ## Integration Points
//!
//! - **Input Sources**: any [`tenor_ledger::Environment`], plus [`tenor_config::ProtocolConfig`]
//! - **Authorization**: standing delegations or one-shot signatures, see [`Authorizations`]
//! - **Flash liquidity**: the claim flash mint of the target pool
//!
//! ## Architecture Role
//!
//! ```text
//!                 ┌──────────────┐
//!  user call ───► │  PoolProxy   │──┐
//!                 │  RollEngine  │  │ trades, mints, burns ──► pools
//!                 │  Migration   │  ├─ post, borrow, repay ──► position ledger
//!                 │  BaseLender  │  │ settle, draw ──────────► foreign ledger
//!                 └──────────────┘──┘ flash mint ───────────► claim token
//! ```
//!
//! ## Guarantees
//!
//! - **All or nothing**: every operation is meant to run inside
//!   `Market::atomic` or `SharedMarket::execute`; a failure leaves no trace
//! - **No residue**: on success a proxy holds at most the configured rounding
//!   epsilon of every asset it touched
//! - **Closed callbacks**: flash callbacks are accepted only for loans the
//!   proxy itself requested from the expected pool

pub mod logging;

pub mod flash_guard;
pub mod flash_loan;
pub mod migration;
pub mod pool_proxy;
pub mod pricing;
pub mod residue;
pub mod roll;

pub use flash_loan::{BaseFlashBorrower, BaseFlashLender};
pub use migration::{ExportReceipt, ImportReceipt, MigrationBridge};
pub use pool_proxy::{
    AddLiquidityReceipt, Authorizations, BuyAndAddReceipt, PoolProxy, RemoveLiquidityReceipt,
    LIQUIDITY_COLLATERAL,
};
pub use residue::ensure_no_residue;
pub use roll::{RollEngine, RollReceipt};
