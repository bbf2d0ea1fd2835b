//! Collateral and claim debt bookkeeping for the position ledger
//!
//! Token movements are left to the market; this module only tracks what is
//! posted, what is owed and whether a position stays collateralized.

use crate::AuthorizationGate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tenor_types::{
    mul_div, mul_div_up, Address, Collateral, Maturity, ProtocolError, ProtocolResult, RAY,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBook {
    /// Custody account for posted collateral
    pub address: Address,
    /// Receives base repayments and funds redemptions
    pub treasury: Address,
    pub gate: AuthorizationGate,
    posted: BTreeMap<(Collateral, Address), u128>,
    debt: BTreeMap<(Collateral, Maturity, Address), u128>,
    /// Post-maturity debt growth per maturity, in RAY
    rate_growth: BTreeMap<Maturity, u128>,
    /// Spot price of non-savings collateral, in RAY
    spot: BTreeMap<Collateral, u128>,
}

impl PositionBook {
    pub fn new(address: Address, treasury: Address) -> Self {
        Self {
            address,
            treasury,
            gate: AuthorizationGate::new(address),
            posted: BTreeMap::new(),
            debt: BTreeMap::new(),
            rate_growth: BTreeMap::new(),
            spot: BTreeMap::new(),
        }
    }

    pub fn posted(&self, collateral: Collateral, owner: Address) -> u128 {
        self.posted.get(&(collateral, owner)).copied().unwrap_or(0)
    }

    pub fn debt(&self, collateral: Collateral, maturity: Maturity, owner: Address) -> u128 {
        self.debt
            .get(&(collateral, maturity, owner))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_posted(&mut self, collateral: Collateral, owner: Address, amount: u128) {
        if amount == 0 {
            self.posted.remove(&(collateral, owner));
        } else {
            self.posted.insert((collateral, owner), amount);
        }
    }

    pub fn set_debt(&mut self, collateral: Collateral, maturity: Maturity, owner: Address, amount: u128) {
        if amount == 0 {
            self.debt.remove(&(collateral, maturity, owner));
        } else {
            self.debt.insert((collateral, maturity, owner), amount);
        }
    }

    pub fn rate_growth(&self, maturity: Maturity) -> u128 {
        self.rate_growth.get(&maturity).copied().unwrap_or(RAY)
    }

    pub fn set_rate_growth(&mut self, maturity: Maturity, growth: u128) {
        self.rate_growth.insert(maturity, growth);
    }

    pub fn spot(&self, collateral: Collateral) -> u128 {
        self.spot.get(&collateral).copied().unwrap_or(0)
    }

    pub fn set_spot(&mut self, collateral: Collateral, price: u128) {
        self.spot.insert(collateral, price);
    }

    /// Claim debt expressed in base at `now`
    pub fn debt_in_base(&self, maturity: Maturity, claim_debt: u128, now: u64) -> ProtocolResult<u128> {
        if !maturity.has_matured(now) {
            return Ok(claim_debt);
        }
        mul_div_up(claim_debt, self.rate_growth(maturity), RAY)
    }

    /// Posted units not needed to back `owner`'s debt at `price`
    pub fn free_collateral(
        &self,
        collateral: Collateral,
        owner: Address,
        price: u128,
        now: u64,
    ) -> ProtocolResult<u128> {
        let posted = self.posted(collateral, owner);
        let mut total = 0u128;
        for (&(c, maturity, who), &amount) in &self.debt {
            if c == collateral && who == owner {
                total = total
                    .checked_add(self.debt_in_base(maturity, amount, now)?)
                    .ok_or(ProtocolError::Arithmetic("debt overflow"))?;
            }
        }
        if total == 0 {
            return Ok(posted);
        }
        if price == 0 {
            return Ok(0);
        }
        Ok(posted.saturating_sub(mul_div_up(total, RAY, price)?))
    }

    /// Collateralization of `owner`'s `collateral` position with `posted`
    /// units and the debt at `maturity` replaced by `debt_override`
    pub fn ensure_collateralized(
        &self,
        collateral: Collateral,
        owner: Address,
        price: u128,
        posted: u128,
        debt_override: Option<(Maturity, u128)>,
        now: u64,
    ) -> ProtocolResult<()> {
        let mut total = 0u128;
        for (&(c, maturity, who), &amount) in &self.debt {
            if c != collateral || who != owner {
                continue;
            }
            let amount = match debt_override {
                Some((m, replaced)) if m == maturity => replaced,
                _ => amount,
            };
            total = total
                .checked_add(self.debt_in_base(maturity, amount, now)?)
                .ok_or(ProtocolError::Arithmetic("debt overflow"))?;
        }
        if let Some((maturity, amount)) = debt_override {
            if !self.debt.contains_key(&(collateral, maturity, owner)) {
                total = total
                    .checked_add(self.debt_in_base(maturity, amount, now)?)
                    .ok_or(ProtocolError::Arithmetic("debt overflow"))?;
            }
        }

        let power = mul_div(posted, price, RAY)?;
        if total > power {
            return Err(ProtocolError::Undercollateralized { owner, collateral });
        }
        Ok(())
    }
}
