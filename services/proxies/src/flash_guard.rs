//! Flash callback verification shared by every borrower

use tenor_ledger::{FlashRequest, PoolVenue};
use tenor_types::{Address, Asset, Maturity, PoolId, ProtocolError, ProtocolResult};

/// Accept a flash callback only for a loan `borrower` took from `pool`'s
/// claim token, returning the pool's maturity
pub fn verify_flash_callback<E: PoolVenue + ?Sized>(
    env: &E,
    borrower: Address,
    pool: PoolId,
    lender: Address,
    request: &FlashRequest,
) -> ProtocolResult<Maturity> {
    if request.initiator != borrower {
        return Err(ProtocolError::UnauthorizedCallback {
            reason: "loan was issued to another borrower",
        });
    }
    if request.pool != pool {
        return Err(ProtocolError::UnauthorizedCallback {
            reason: "loan came from an unexpected pool",
        });
    }
    let state = env.pool(pool)?;
    if lender != state.claim_token {
        return Err(ProtocolError::UnauthorizedCallback {
            reason: "lender is not the pool's claim token",
        });
    }
    if request.asset != Asset::Claim(state.maturity) {
        return Err(ProtocolError::UnauthorizedCallback {
            reason: "loan asset is not the pool's claim",
        });
    }
    Ok(state.maturity)
}
