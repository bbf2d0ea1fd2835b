//! Delegation and one-shot signature gating of proxy operations

mod common;

use common::*;
use ethers::signers::{LocalWallet, Signer};
use rust_decimal_macros::dec;
use tenor_ledger::{sign_authorization, Market, PoolVenue, PositionLedger, TokenLedger};
use tenor_proxies::{Authorizations, PoolProxy};
use tenor_types::{Address, Asset, Maturity, PoolId, ProtocolError, WAD};

const OWNER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const OTHER_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

fn wallet(key: &str) -> LocalWallet {
    key.parse::<LocalWallet>().unwrap()
}

struct Setup {
    market: Market,
    proxy: PoolProxy,
    pool: PoolId,
    owner: Address,
}

/// Owner funded and approved for base, with no delegation on any gate
fn setup() -> Setup {
    let mut market = market();
    let pool = seeded_pool(&mut market, Maturity::new(NOW + SIX_MONTHS));
    let proxy = PoolProxy::new(proxy_address("tenor.pool-proxy"), &config());
    let owner = wallet(OWNER_KEY).address();
    market.mint_to(Asset::Base, owner, 10 * WAD).unwrap();
    market.approve(owner, proxy.address(), Asset::Base, true);
    Setup {
        market,
        proxy,
        pool,
        owner,
    }
}

#[test]
fn test_delegation_unlocks_the_identical_call() {
    let Setup {
        mut market,
        proxy,
        pool,
        owner,
    } = setup();
    let add = |m: &mut Market| proxy.add_liquidity(m, owner, pool, WAD, WAD, &Authorizations::delegated());

    assert_eq!(
        market.atomic(add),
        Err(ProtocolError::NotAuthorized {
            owner,
            delegate: proxy.address()
        })
    );
    assert_eq!(market.balance_of(Asset::Base, owner), 10 * WAD);

    market.position_gate_mut().add_delegate(owner, proxy.address());
    assert!(market.atomic(add).is_ok());

    market.position_gate_mut().revoke_delegate(owner, proxy.address());
    assert!(matches!(
        market.atomic(add),
        Err(ProtocolError::NotAuthorized { .. })
    ));
}

#[test]
fn test_signature_is_consumed_once() {
    let Setup {
        mut market,
        proxy,
        pool,
        owner,
    } = setup();
    let domain = market.ledger_address();
    let signed = sign_authorization(&wallet(OWNER_KEY), domain, proxy.address(), 0, NOW + 3_600).unwrap();
    let auths = Authorizations::delegated().with_ledger(signed);

    market
        .atomic(|m| proxy.add_liquidity(m, owner, pool, WAD, WAD, &auths))
        .unwrap();
    assert_eq!(market.position_gate().signature_count(owner), 1);
    // One-shot: no standing grant was created
    assert!(!market.position_gate().is_delegate(owner, proxy.address()));

    assert_eq!(
        market.atomic(|m| proxy.add_liquidity(m, owner, pool, WAD, WAD, &auths)),
        Err(ProtocolError::InvalidNonce {
            expected: 1,
            provided: 0
        })
    );
}

#[test]
fn test_expired_and_foreign_signatures_fail() {
    let Setup {
        mut market,
        proxy,
        pool,
        owner,
    } = setup();
    let domain = market.ledger_address();

    let expired = sign_authorization(&wallet(OWNER_KEY), domain, proxy.address(), 0, NOW - 1).unwrap();
    assert_eq!(
        market.atomic(|m| {
            proxy.add_liquidity(
                m,
                owner,
                pool,
                WAD,
                WAD,
                &Authorizations::delegated().with_ledger(expired.clone()),
            )
        }),
        Err(ProtocolError::AuthorizationExpired {
            expiry: NOW - 1,
            now: NOW
        })
    );

    // Signed by someone else but presented as the owner's
    let mut forged = sign_authorization(&wallet(OTHER_KEY), domain, proxy.address(), 0, NOW + 60).unwrap();
    forged.owner = owner;
    assert!(matches!(
        market.atomic(|m| {
            proxy.add_liquidity(
                m,
                owner,
                pool,
                WAD,
                WAD,
                &Authorizations::delegated().with_ledger(forged.clone()),
            )
        }),
        Err(ProtocolError::NotAuthorized { .. })
    ));

    // A signature for the ledger does not open the pool
    let pool_domain = market.pool(pool).unwrap().address;
    assert_ne!(pool_domain, domain);
    assert_eq!(market.position_gate().signature_count(owner), 0);
}

#[test]
fn test_removal_needs_pool_authorization() {
    let Setup {
        mut market,
        proxy,
        pool,
        owner,
    } = setup();
    market.position_gate_mut().add_delegate(owner, proxy.address());
    let added = market
        .atomic(|m| proxy.add_liquidity(m, owner, pool, WAD, WAD, &Authorizations::delegated()))
        .unwrap();

    let unsigned = market.atomic(|m| {
        proxy.remove_liquidity_by_repaying(m, owner, pool, added.shares, dec!(0), &Authorizations::delegated())
    });
    assert_eq!(
        unsigned,
        Err(ProtocolError::NotAuthorized {
            owner,
            delegate: proxy.address()
        })
    );

    let pool_domain = market.pool(pool).unwrap().address;
    let signed = sign_authorization(&wallet(OWNER_KEY), pool_domain, proxy.address(), 0, NOW + 60).unwrap();
    let auths = Authorizations::delegated().with_pool(signed);
    let removed = market
        .atomic(|m| proxy.remove_liquidity_by_repaying(m, owner, pool, added.shares, dec!(0), &auths))
        .unwrap();
    assert_eq!(removed.debt_remaining, 0);
    assert_eq!(market.pool_gate(pool).unwrap().signature_count(owner), 1);
}

#[test]
fn test_buy_and_add_is_gated_by_the_base_approval() {
    let Setup {
        mut market,
        proxy,
        pool,
        owner,
    } = setup();
    market.approve(owner, proxy.address(), Asset::Base, false);

    let buy = |m: &mut Market| proxy.buy_and_add_liquidity(m, owner, pool, 5 * WAD, 5 * WAD);
    assert_eq!(
        market.atomic(buy),
        Err(ProtocolError::NotAuthorized {
            owner,
            delegate: proxy.address()
        })
    );
    assert_eq!(market.balance_of(Asset::Base, owner), 10 * WAD);

    // Shares are minted from the proxy's own funds, so no gate grant is needed
    market.approve(owner, proxy.address(), Asset::Base, true);
    let receipt = market.atomic(buy).unwrap();
    assert!(receipt.shares > 0);
    assert_eq!(market.balance_of(Asset::Shares(pool), owner), receipt.shares);
    assert!(!market.position_gate().is_delegate(owner, proxy.address()));
    assert!(!market.pool_gate(pool).unwrap().is_delegate(owner, proxy.address()));
}
