//! End-to-End Test Framework for Tenor
//!
//! Deploys a shared market with seeded pools and every proxy, then drives
//! whole position lifecycles through it: providing liquidity, rolling debt
//! across maturities, migrating vaults and settling after maturity.

pub mod framework;
pub mod scenarios;

pub use framework::{Deployment, ScenarioReport, TestScenario};
pub use scenarios::*;
