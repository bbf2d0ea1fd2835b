//! Token balances, operator approvals and the savings wrapper

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tenor_types::{mul_div, Address, Asset, Collateral, ProtocolError, ProtocolResult, RAY};
use tracing::trace;

/// Every fungible balance, keyed by (asset, account)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBook {
    balances: BTreeMap<(Asset, Address), u128>,
    /// (owner, operator, asset) approvals
    approvals: BTreeSet<(Address, Address, Asset)>,
    /// Base per savings unit, in RAY
    savings_rate: u128,
    /// Account holding base backing the savings token
    savings_vault: Address,
}

impl TokenBook {
    pub fn new(savings_vault: Address) -> Self {
        Self {
            balances: BTreeMap::new(),
            approvals: BTreeSet::new(),
            savings_rate: RAY,
            savings_vault,
        }
    }

    pub fn balance(&self, asset: Asset, account: Address) -> u128 {
        self.balances.get(&(asset, account)).copied().unwrap_or(0)
    }

    /// Mint to `account`
    pub fn credit(&mut self, asset: Asset, account: Address, amount: u128) -> ProtocolResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry((asset, account)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(ProtocolError::Arithmetic("balance overflow"))?;
        Ok(())
    }

    /// Burn from `account`
    pub fn debit(&mut self, asset: Asset, account: Address, amount: u128) -> ProtocolResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance(asset, account);
        if available < amount {
            return Err(ProtocolError::InsufficientBalance {
                asset,
                account,
                required: amount,
                available,
            });
        }
        if available == amount {
            self.balances.remove(&(asset, account));
        } else {
            self.balances.insert((asset, account), available - amount);
        }
        Ok(())
    }

    pub fn move_tokens(
        &mut self,
        asset: Asset,
        from: Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)?;
        trace!(%asset, ?from, ?to, amount, "Transfer");
        Ok(())
    }

    pub fn set_approval(&mut self, owner: Address, operator: Address, asset: Asset, approved: bool) {
        if approved {
            self.approvals.insert((owner, operator, asset));
        } else {
            self.approvals.remove(&(owner, operator, asset));
        }
    }

    pub fn is_approved(&self, owner: Address, operator: Address, asset: Asset) -> bool {
        self.approvals.contains(&(owner, operator, asset))
    }

    pub fn savings_rate(&self) -> u128 {
        self.savings_rate
    }

    pub fn set_savings_rate(&mut self, rate: u128) {
        self.savings_rate = rate;
    }

    /// Units minted for `base` are floored
    pub fn wrap(&mut self, account: Address, base: u128) -> ProtocolResult<u128> {
        let units = mul_div(base, RAY, self.savings_rate)?;
        self.move_tokens(Asset::Base, account, self.savings_vault, base)?;
        self.credit(Asset::Collateral(Collateral::Savings), account, units)?;
        Ok(units)
    }

    /// Base released for `units` is floored
    pub fn unwrap(&mut self, account: Address, units: u128) -> ProtocolResult<u128> {
        let base = mul_div(units, self.savings_rate, RAY)?;
        self.debit(Asset::Collateral(Collateral::Savings), account, units)?;
        self.move_tokens(Asset::Base, self.savings_vault, account, base)?;
        Ok(base)
    }
}
