//! Shared fixtures for the proxy integration tests

#![allow(dead_code)]

use tenor_config::ProtocolConfig;
use tenor_ledger::{derive_address, Market, PoolVenue, PositionLedger, TokenLedger};
use tenor_proxies::logging::init_test_tracing;
use tenor_types::{Address, Asset, Collateral, Maturity, PoolId, WAD};

pub const NOW: u64 = 1_700_000_000;
pub const SIX_MONTHS: u64 = 15_778_476;
pub const EPSILON: u128 = 100;

pub fn account(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn config() -> ProtocolConfig {
    ProtocolConfig::default()
}

pub fn market() -> Market {
    init_test_tracing();
    Market::new(&config(), NOW)
}

pub fn proxy_address(label: &str) -> Address {
    derive_address(label, 0)
}

/// Pool with 1000 base of liquidity and 34.4 claims sold into it, so the
/// virtual claim reserve is 1034.4
pub fn seeded_pool(market: &mut Market, maturity: Maturity) -> PoolId {
    let id = market.create_pool(maturity);
    let lp = account(0x11);
    market.mint_to(Asset::Base, lp, 1_000 * WAD).unwrap();
    market
        .mint_to(Asset::Claim(maturity), lp, 344 * WAD / 10)
        .unwrap();
    market.mint_liquidity(lp, id, lp, 1_000 * WAD).unwrap();
    market.sell_claim(lp, id, 344 * WAD / 10).unwrap();
    id
}

/// Give `owner` base and let `proxy` pull it and act on the position ledger
pub fn fund_and_delegate(market: &mut Market, owner: Address, proxy: Address, base: u128) {
    market.mint_to(Asset::Base, owner, base).unwrap();
    market.approve(owner, proxy, Asset::Base, true);
    market.position_gate_mut().add_delegate(owner, proxy);
}

pub fn delegate_pool(market: &mut Market, pool: PoolId, owner: Address, proxy: Address) {
    market.pool_gate_mut(pool).unwrap().add_delegate(owner, proxy);
}

/// Post savings collateral for `owner` and borrow `claims` at `maturity`
pub fn open_debt(market: &mut Market, owner: Address, collateral: u128, maturity: Maturity, claims: u128) {
    market
        .mint_to(Asset::Collateral(Collateral::Savings), owner, collateral)
        .unwrap();
    market
        .post(owner, Collateral::Savings, owner, collateral)
        .unwrap();
    let auth = market.authorize_position(owner, owner, None).unwrap();
    market
        .borrow(&auth, Collateral::Savings, maturity, owner, claims)
        .unwrap();
}

pub fn assert_holds_nothing(market: &Market, holder: Address, assets: &[Asset]) {
    for &asset in assets {
        let balance = market.balance_of(asset, holder);
        assert!(
            balance <= EPSILON,
            "{:?} still holds {} of {}",
            holder,
            balance,
            asset
        );
    }
}
