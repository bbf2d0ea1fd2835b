//! Full position lifecycles across every proxy sharing one market

use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tenor_config::ProtocolConfig;
use tenor_e2e_tests::{
    Deployment, LiquidityLifecycle, MigrationRoundTrip, RollToMaturity, TestScenario,
};
use tenor_ledger::{FlashLender, PoolVenue, PositionLedger, TokenLedger};
use tenor_types::{Address, Asset, Collateral, WAD};

const NOW: u64 = 1_700_000_000;
const SIX_MONTHS: u64 = 15_778_476;

fn account(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn deployment(config: ProtocolConfig) -> Deployment {
    tenor_proxies::logging::init_test_tracing();
    Deployment::launch(config, NOW, &[SIX_MONTHS, 2 * SIX_MONTHS]).unwrap()
}

fn load(dir: &Path, content: &str) -> ProtocolConfig {
    let path = dir.join("tenor.toml");
    fs::write(&path, content).unwrap();
    ProtocolConfig::load(Some(&path)).unwrap()
}

#[test]
fn test_liquidity_lifecycle() {
    let mut deployment = deployment(ProtocolConfig::default());
    let scenario = LiquidityLifecycle {
        provider: account(1),
        trader: account(2),
        amount: 10 * WAD,
    };
    let report = deployment.run(&scenario).unwrap();
    assert_eq!(report.scenario, "liquidity_lifecycle");
    assert!(report.steps.len() >= 5);
}

#[test]
fn test_roll_to_maturity() {
    let mut deployment = deployment(ProtocolConfig::default());
    let scenario = RollToMaturity {
        owner: account(3),
        collateral: 100 * WAD,
        debt: 20 * WAD,
    };
    deployment.run(&scenario).unwrap();
}

#[test]
fn test_migration_round_trip() {
    let mut deployment = deployment(ProtocolConfig::default());
    let scenario = MigrationRoundTrip {
        owner: account(4),
        locked: WAD,
        drawn: 30 * WAD,
    };
    deployment.run(&scenario).unwrap();
    assert_eq!(deployment.balance(Asset::Base, account(4)), 30 * WAD);
}

#[test]
fn test_scenarios_share_one_deployment() {
    let mut deployment = deployment(ProtocolConfig::default());
    let scenarios: Vec<Box<dyn TestScenario>> = vec![
        Box::new(MigrationRoundTrip {
            owner: account(5),
            locked: WAD,
            drawn: 20 * WAD,
        }),
        Box::new(RollToMaturity {
            owner: account(6),
            collateral: 50 * WAD,
            debt: 10 * WAD,
        }),
    ];
    for scenario in &scenarios {
        deployment.run(scenario.as_ref()).unwrap();
    }
    // The roll ended past both maturities
    let now = deployment.market.read(|m| tenor_ledger::Clock::now(m));
    assert_eq!(now, NOW + 2 * SIX_MONTHS);
}

#[test]
fn test_roll_pays_the_configured_flash_fee() {
    let dir = tempdir().unwrap();
    let config = load(
        dir.path(),
        r#"
[flash]
fee_bps = 30

[proxy]
rounding_epsilon = 250
"#,
    );
    assert_eq!(config.flash.fee_bps, 30);
    let mut deployment = deployment(config);
    let (pool_a, maturity_a) = deployment.pool(0).unwrap();
    let (pool_b, maturity_b) = deployment.pool(1).unwrap();
    let owner = account(7);
    let engine = deployment.roll.address();

    deployment
        .fund(owner, Asset::Collateral(Collateral::Savings), 100 * WAD)
        .unwrap();
    deployment
        .market
        .execute(|m| {
            m.post(owner, Collateral::Savings, owner, 100 * WAD)?;
            let auth = m.authorize_position(owner, owner, None)?;
            m.borrow(&auth, Collateral::Savings, maturity_a, owner, 10 * WAD)?;
            m.position_gate_mut().add_delegate(owner, engine);
            Ok(())
        })
        .unwrap();

    let Deployment { market, roll, .. } = &mut deployment;
    let (flashed, fee) = market.read(|m| {
        let cost = roll.base_cost_to_repay(m, pool_a, 10 * WAD).unwrap();
        let flashed = m.quote_buy_base(pool_b, cost).unwrap();
        (flashed, m.flash_fee(flashed).unwrap())
    });
    assert!(fee > 0);

    let receipt = market
        .execute(|m| {
            roll.roll_all(m, owner, owner, Collateral::Savings, pool_a, pool_b, u128::MAX, None)
        })
        .unwrap();

    assert_eq!(receipt.new_debt, flashed + fee);
    market.read(|m| {
        assert_eq!(m.debt_claim(Collateral::Savings, maturity_a, owner), 0);
        assert_eq!(
            m.debt_claim(Collateral::Savings, maturity_b, owner),
            receipt.new_debt
        );
        assert_eq!(m.balance_of(Asset::Base, engine), 0);
    });
}

#[test]
fn test_missing_pools_fail_before_running() {
    tenor_proxies::logging::init_test_tracing();
    let mut deployment = Deployment::launch(ProtocolConfig::default(), NOW, &[SIX_MONTHS]).unwrap();
    let scenario = RollToMaturity {
        owner: account(8),
        collateral: 10 * WAD,
        debt: WAD,
    };
    let err = deployment.run(&scenario).unwrap_err();
    assert!(err.to_string().contains("needs 2 pools"));
}
