//! Post-call residue guard
//!
//! Every proxy operation ends by checking that the proxy's own balances are
//! back to (almost) nothing. Rounding always favors the pool, so a correct
//! operation leaves at most a few base units behind.

use tenor_ledger::TokenLedger;
use tenor_types::{Address, Asset, ProtocolError, ProtocolResult};
use tracing::trace;

/// Fail with `ResidueExceeded` if `holder` keeps more than `limit` of any asset
pub fn ensure_no_residue<E: TokenLedger + ?Sized>(
    env: &E,
    holder: Address,
    assets: &[Asset],
    limit: u128,
) -> ProtocolResult<()> {
    for &asset in assets {
        let amount = env.balance_of(asset, holder);
        trace!(%asset, ?holder, amount, "Residue");
        if amount > limit {
            return Err(ProtocolError::ResidueExceeded {
                asset,
                holder,
                amount,
                limit,
            });
        }
    }
    Ok(())
}
