//! Foreign ledger vaults
//!
//! A vault locks collateral (`ink`) against normalized debt (`art`). Debt in
//! base is `art * rate`, rounded up. The manager set mirrors a vault
//! manager's per-handle allow list.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tenor_types::{
    mul_div, mul_div_up, Address, Collateral, ProtocolError, ProtocolResult, VaultHandle, RAY,
};

/// One vault on the foreign ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignPosition {
    pub handle: VaultHandle,
    pub owner: Address,
    pub collateral: Collateral,
    /// Collateral locked
    pub locked: u128,
    /// Debt before applying the accumulated rate
    pub normalized_debt: u128,
    /// Accounts the owner allowed to manage the vault
    pub managers: BTreeSet<Address>,
}

impl ForeignPosition {
    pub fn can_manage(&self, who: Address) -> bool {
        self.owner == who || self.managers.contains(&who)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultBook {
    /// Custody account for locked collateral
    pub address: Address,
    vaults: BTreeMap<VaultHandle, ForeignPosition>,
    /// Accumulated rate per collateral, in RAY
    rates: BTreeMap<Collateral, u128>,
    /// Liquidation price per collateral, in RAY
    spot: BTreeMap<Collateral, u128>,
    next_handle: u64,
}

impl VaultBook {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            vaults: BTreeMap::new(),
            rates: BTreeMap::new(),
            spot: BTreeMap::new(),
            next_handle: 1,
        }
    }

    pub fn get(&self, handle: VaultHandle) -> ProtocolResult<&ForeignPosition> {
        self.vaults
            .get(&handle)
            .ok_or(ProtocolError::UnknownVault(handle))
    }

    pub fn get_mut(&mut self, handle: VaultHandle) -> ProtocolResult<&mut ForeignPosition> {
        self.vaults
            .get_mut(&handle)
            .ok_or(ProtocolError::UnknownVault(handle))
    }

    pub fn open(&mut self, owner: Address, collateral: Collateral) -> VaultHandle {
        let handle = VaultHandle::new(self.next_handle);
        self.next_handle += 1;
        self.vaults.insert(
            handle,
            ForeignPosition {
                handle,
                owner,
                collateral,
                locked: 0,
                normalized_debt: 0,
                managers: BTreeSet::new(),
            },
        );
        handle
    }

    pub fn rate(&self, collateral: Collateral) -> u128 {
        self.rates.get(&collateral).copied().unwrap_or(RAY)
    }

    pub fn set_rate(&mut self, collateral: Collateral, rate: u128) {
        self.rates.insert(collateral, rate);
    }

    pub fn spot(&self, collateral: Collateral) -> u128 {
        self.spot.get(&collateral).copied().unwrap_or(0)
    }

    pub fn set_spot(&mut self, collateral: Collateral, price: u128) {
        self.spot.insert(collateral, price);
    }

    /// Base owed for `normalized_debt` at the current rate, rounded up
    pub fn to_base(&self, collateral: Collateral, normalized_debt: u128) -> ProtocolResult<u128> {
        mul_div_up(normalized_debt, self.rate(collateral), RAY)
    }

    /// Normalized debt for drawing exactly `base`, rounded up
    pub fn to_normalized(&self, collateral: Collateral, base: u128) -> ProtocolResult<u128> {
        mul_div_up(base, RAY, self.rate(collateral))
    }

    /// `locked * spot >= normalized_debt * rate`
    pub fn ensure_safe(
        &self,
        collateral: Collateral,
        owner: Address,
        locked: u128,
        normalized_debt: u128,
    ) -> ProtocolResult<()> {
        let power = mul_div(locked, self.spot(collateral), RAY)?;
        if self.to_base(collateral, normalized_debt)? > power {
            return Err(ProtocolError::Undercollateralized { owner, collateral });
        }
        Ok(())
    }
}
