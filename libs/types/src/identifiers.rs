//! Typed identifiers
//!
//! Zero-cost wrappers that keep pool ids, maturities and foreign vault
//! handles from being confused with each other or with raw amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_typed_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $label:literal
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            #[inline(always)]
            pub const fn new(inner: $inner) -> Self {
                Self(inner)
            }

            #[inline(always)]
            pub const fn inner(&self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(inner: $inner) -> Self {
                Self(inner)
            }
        }
    };
}

define_typed_id!(
    /// Identifier of an AMM pool in the venue registry
    PoolId, u32, "pool"
);

define_typed_id!(
    /// Handle of a position on the foreign ledger
    VaultHandle, u64, "vault"
);

define_typed_id!(
    /// Maturity of a claim token, as a unix timestamp in seconds.
    ///
    /// A maturity doubles as the claim id: there is exactly one claim token
    /// (and one pool) per maturity.
    Maturity, u64, "maturity"
);

impl Maturity {
    /// Whether the claim has matured at `now`
    #[inline]
    pub const fn has_matured(&self, now: u64) -> bool {
        now >= self.0
    }

    /// Seconds left until maturity, zero once matured
    #[inline]
    pub const fn seconds_until(&self, now: u64) -> u64 {
        self.0.saturating_sub(now)
    }
}
