//! Assets tracked by the token ledger

use crate::{Maturity, PoolId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collateral types accepted by the position ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Collateral {
    /// Volatile collateral valued at the ledger's spot price
    Ether,
    /// Base currency wrapped in the savings token, valued at its exchange rate
    Savings,
}

/// Every fungible balance in the system is keyed by one of these
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The base currency the claims settle in
    Base,
    /// Fixed-yield claim redeemable 1:1 for base at maturity
    Claim(Maturity),
    /// Collateral token
    Collateral(Collateral),
    /// Liquidity shares of a pool
    Shares(PoolId),
}

impl fmt::Display for Collateral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collateral::Ether => write!(f, "ETH"),
            Collateral::Savings => write!(f, "SAVINGS"),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Base => write!(f, "BASE"),
            Asset::Claim(maturity) => write!(f, "CLAIM@{}", maturity.inner()),
            Asset::Collateral(collateral) => write!(f, "{}", collateral),
            Asset::Shares(pool) => write!(f, "SHARES/{}", pool),
        }
    }
}
