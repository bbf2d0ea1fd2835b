//! # Tenor Ledger - Collaborators and In-Memory Market
//!
//! ## Purpose
//!
//! Everything the orchestration proxies consume but do not own: token
//! balances, the position ledger (collateral, debt, delegations, nonces),
//! the foreign ledger positions are migrated to and from, the pool venue and
//! the claim flash-mint primitive. Each concern is a trait in [`traits`];
//! [`Market`] implements all of them in memory.
//!
//! ## Atomicity
//!
//! [`Market::atomic`] snapshots the full state with bincode, runs a unit of
//! work and restores the snapshot if the unit fails. [`SharedMarket`] puts a
//! market behind a mutex so concurrent callers serialize; it is the only
//! place a lock is taken.
//!
//! ## Authorization
//!
//! The position ledger and every pool carry an [`AuthorizationGate`]. A gate
//! turns a standing delegation or a one-shot signature into an
//! [`Authorized`] capability, which ledger and pool methods that act on an
//! owner's behalf require.

pub mod auth;
pub mod flash;
pub mod market;
pub mod positions;
pub mod shared;
pub mod tokens;
pub mod traits;
pub mod vaults;

pub use auth::{
    authorization_digest, sign_authorization, AuthorizationGate, Authorized, SignedAuthorization,
};
pub use flash::{FlashBorrower, FlashRequest};
pub use market::{derive_address, Market};
pub use shared::SharedMarket;
pub use traits::{
    Clock, Environment, FlashLender, ForeignLedger, PoolVenue, PositionLedger, Stateful,
    TokenLedger,
};
pub use vaults::ForeignPosition;
