//! Delegation and signed authorizations
//!
//! Each gate guards one domain (the position ledger or a single pool). An
//! owner can grant a standing delegation, or sign a one-shot authorization
//! that a delegate presents with its call. Signatures are bound to the
//! domain, the delegate, a per-owner nonce and an expiry.

use ethers::core::types::Signature;
use ethers::core::utils::keccak256;
use ethers::signers::{LocalWallet, Signer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tenor_types::{Address, ProtocolError, ProtocolResult, H256};
use tracing::{debug, info};

/// Prefix of every authorization digest
pub const AUTHORIZATION_TAG: &[u8] = b"tenor.authorization.v1";

/// An owner's signature permitting `delegate` to act once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAuthorization {
    pub owner: Address,
    pub delegate: Address,
    pub nonce: u64,
    pub expiry: u64,
    pub signature: Signature,
}

/// Proof that `delegate` may act for `owner` within one gate's domain.
///
/// Only [`AuthorizationGate::authorize`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    owner: Address,
    delegate: Address,
    domain: Address,
}

impl Authorized {
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn delegate(&self) -> Address {
        self.delegate
    }

    pub fn domain(&self) -> Address {
        self.domain
    }
}

/// Standing delegations and signature nonces for one domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGate {
    domain: Address,
    /// (owner, delegate) pairs
    delegates: BTreeSet<(Address, Address)>,
    nonces: BTreeMap<Address, u64>,
}

impl AuthorizationGate {
    pub fn new(domain: Address) -> Self {
        Self {
            domain,
            ..Self::default()
        }
    }

    pub fn domain(&self) -> Address {
        self.domain
    }

    pub fn add_delegate(&mut self, owner: Address, delegate: Address) {
        if self.delegates.insert((owner, delegate)) {
            info!(?owner, ?delegate, domain = ?self.domain, "Delegate added");
        }
    }

    pub fn revoke_delegate(&mut self, owner: Address, delegate: Address) {
        if self.delegates.remove(&(owner, delegate)) {
            info!(?owner, ?delegate, domain = ?self.domain, "Delegate revoked");
        }
    }

    pub fn is_delegate(&self, owner: Address, delegate: Address) -> bool {
        self.delegates.contains(&(owner, delegate))
    }

    /// Signatures consumed so far, which is also the next valid nonce
    pub fn signature_count(&self, owner: Address) -> u64 {
        self.nonces.get(&owner).copied().unwrap_or(0)
    }

    pub fn digest(&self, owner: Address, delegate: Address, nonce: u64, expiry: u64) -> H256 {
        authorization_digest(self.domain, owner, delegate, nonce, expiry)
    }

    /// Check `delegate` may act for `owner`.
    ///
    /// A presented signature is always verified and consumed, even when a
    /// standing delegation would have sufficed. Without one, the owner acts
    /// for itself or a standing delegation is required.
    pub fn authorize(
        &mut self,
        owner: Address,
        delegate: Address,
        signature: Option<&SignedAuthorization>,
        now: u64,
    ) -> ProtocolResult<Authorized> {
        match signature {
            Some(signed) => self.consume(signed, owner, delegate, now)?,
            None if owner == delegate || self.is_delegate(owner, delegate) => {}
            None => return Err(ProtocolError::NotAuthorized { owner, delegate }),
        }
        Ok(Authorized {
            owner,
            delegate,
            domain: self.domain,
        })
    }

    /// Reject capabilities issued by another gate
    pub fn verify(&self, auth: &Authorized) -> ProtocolResult<()> {
        if auth.domain != self.domain {
            return Err(ProtocolError::NotAuthorized {
                owner: auth.owner,
                delegate: auth.delegate,
            });
        }
        Ok(())
    }

    fn consume(
        &mut self,
        signed: &SignedAuthorization,
        owner: Address,
        delegate: Address,
        now: u64,
    ) -> ProtocolResult<()> {
        if signed.owner != owner || signed.delegate != delegate {
            return Err(ProtocolError::NotAuthorized { owner, delegate });
        }
        if now > signed.expiry {
            return Err(ProtocolError::AuthorizationExpired {
                expiry: signed.expiry,
                now,
            });
        }
        let expected = self.signature_count(owner);
        if signed.nonce != expected {
            return Err(ProtocolError::InvalidNonce {
                expected,
                provided: signed.nonce,
            });
        }

        let digest = self.digest(owner, delegate, signed.nonce, signed.expiry);
        let signer = signed
            .signature
            .recover(digest)
            .map_err(|_| ProtocolError::NotAuthorized { owner, delegate })?;
        if signer != owner {
            return Err(ProtocolError::NotAuthorized { owner, delegate });
        }

        self.nonces.insert(owner, expected + 1);
        debug!(?owner, ?delegate, nonce = expected, "Signature consumed");
        Ok(())
    }
}

/// keccak256 over the tag, domain, owner, delegate, nonce and expiry
pub fn authorization_digest(
    domain: Address,
    owner: Address,
    delegate: Address,
    nonce: u64,
    expiry: u64,
) -> H256 {
    let mut message = Vec::with_capacity(AUTHORIZATION_TAG.len() + 3 * 20 + 16);
    message.extend_from_slice(AUTHORIZATION_TAG);
    message.extend_from_slice(domain.as_bytes());
    message.extend_from_slice(owner.as_bytes());
    message.extend_from_slice(delegate.as_bytes());
    message.extend_from_slice(&nonce.to_be_bytes());
    message.extend_from_slice(&expiry.to_be_bytes());
    H256::from(keccak256(message))
}

/// Sign an authorization for `delegate` in `domain` with the owner's wallet
pub fn sign_authorization(
    wallet: &LocalWallet,
    domain: Address,
    delegate: Address,
    nonce: u64,
    expiry: u64,
) -> ProtocolResult<SignedAuthorization> {
    let owner = wallet.address();
    let digest = authorization_digest(domain, owner, delegate, nonce, expiry);
    let signature = wallet
        .sign_hash(digest)
        .map_err(|_| ProtocolError::NotAuthorized { owner, delegate })?;
    Ok(SignedAuthorization {
        owner,
        delegate,
        nonce,
        expiry,
        signature,
    })
}
