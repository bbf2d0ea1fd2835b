//! In-memory market implementing every collaborator trait
//!
//! Holds the token book, the position ledger, the foreign ledger and all
//! pools in one serializable state, so a failed unit of work can be rolled
//! back by restoring a snapshot.

use crate::positions::PositionBook;
use crate::tokens::TokenBook;
use crate::vaults::VaultBook;
use crate::{
    AuthorizationGate, Authorized, Clock, FlashBorrower, FlashLender, FlashRequest,
    ForeignLedger, ForeignPosition, PoolVenue, PositionLedger, Stateful, TokenLedger,
};
use ethers::core::utils::keccak256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tenor_amm::{BurnQuote, MintQuote, PoolState, ReserveMath, SwapFill, TradeKind};
use tenor_config::ProtocolConfig;
use tenor_types::{
    mul_div, mul_div_up, Address, Asset, Collateral, Maturity, PoolId, ProtocolError,
    ProtocolResult, VaultHandle, RAY,
};
use tracing::{debug, info, warn};

const BPS: u128 = 10_000;

/// Deterministic account for a labelled system component
pub fn derive_address(label: &str, index: u64) -> Address {
    let mut preimage = label.as_bytes().to_vec();
    preimage.extend_from_slice(&index.to_be_bytes());
    Address::from_slice(&keccak256(preimage)[12..])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PoolEntry {
    state: PoolState,
    gate: AuthorizationGate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarketState {
    now: u64,
    tokens: TokenBook,
    positions: PositionBook,
    vaults: VaultBook,
    pools: BTreeMap<PoolId, PoolEntry>,
    next_pool: u32,
}

/// Everything the proxies run against, in one process
#[derive(Debug, Clone)]
pub struct Market {
    state: MarketState,
    math: ReserveMath,
    flash_fee_bps: u32,
}

impl Market {
    pub fn new(config: &ProtocolConfig, now: u64) -> Self {
        let positions = PositionBook::new(
            derive_address("tenor.ledger", 0),
            derive_address("tenor.treasury", 0),
        );
        info!(
            now,
            ledger = ?positions.address,
            "Market initialized"
        );
        Self {
            state: MarketState {
                now,
                tokens: TokenBook::new(derive_address("tenor.savings", 0)),
                positions,
                vaults: VaultBook::new(derive_address("tenor.foreign", 0)),
                pools: BTreeMap::new(),
                next_pool: 1,
            },
            math: ReserveMath::new(&config.curve),
            flash_fee_bps: config.flash.fee_bps,
        }
    }

    /// Run `unit` and roll every state change back if it fails
    pub fn atomic<T>(
        &mut self,
        unit: impl FnOnce(&mut Self) -> ProtocolResult<T>,
    ) -> ProtocolResult<T> {
        let snapshot = self.snapshot()?;
        match unit(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.restore(&snapshot)?;
                warn!(%err, "Unit rolled back");
                Err(err)
            }
        }
    }

    /// Open a pool for `maturity`; its first mint is base only
    pub fn create_pool(&mut self, maturity: Maturity) -> PoolId {
        let id = PoolId::new(self.state.next_pool);
        self.state.next_pool += 1;
        let address = derive_address("tenor.pool", id.inner() as u64);
        let claim_token = derive_address("tenor.claim", maturity.inner());
        self.state.pools.insert(
            id,
            PoolEntry {
                state: PoolState::new(id, maturity, address, claim_token),
                gate: AuthorizationGate::new(address),
            },
        );
        info!(%id, %maturity, ?address, "Pool created");
        id
    }

    /// Issue tokens out of thin air
    pub fn mint_to(&mut self, asset: Asset, account: Address, amount: u128) -> ProtocolResult<()> {
        self.state.tokens.credit(asset, account, amount)
    }

    pub fn set_time(&mut self, now: u64) {
        self.state.now = now;
    }

    pub fn advance(&mut self, seconds: u64) {
        self.state.now += seconds;
    }

    pub fn treasury(&self) -> Address {
        self.state.positions.treasury
    }

    pub fn foreign_address(&self) -> Address {
        self.state.vaults.address
    }

    pub fn set_savings_rate(&mut self, rate: u128) {
        self.state.tokens.set_savings_rate(rate);
    }

    pub fn set_collateral_spot(&mut self, collateral: Collateral, price: u128) {
        self.state.positions.set_spot(collateral, price);
    }

    pub fn set_rate_growth(&mut self, maturity: Maturity, growth: u128) {
        self.state.positions.set_rate_growth(maturity, growth);
    }

    pub fn set_foreign_rate(&mut self, collateral: Collateral, rate: u128) {
        self.state.vaults.set_rate(collateral, rate);
    }

    pub fn set_foreign_spot(&mut self, collateral: Collateral, price: u128) {
        self.state.vaults.set_spot(collateral, price);
    }

    fn entry(&self, id: PoolId) -> ProtocolResult<&PoolEntry> {
        self.state.pools.get(&id).ok_or(ProtocolError::UnknownPool(id))
    }

    fn entry_mut(&mut self, id: PoolId) -> ProtocolResult<&mut PoolEntry> {
        self.state
            .pools
            .get_mut(&id)
            .ok_or(ProtocolError::UnknownPool(id))
    }

    fn ensure_position_safe(
        &self,
        collateral: Collateral,
        owner: Address,
        posted: u128,
        debt_override: Option<(Maturity, u128)>,
    ) -> ProtocolResult<()> {
        self.state.positions.ensure_collateralized(
            collateral,
            owner,
            self.collateral_price(collateral),
            posted,
            debt_override,
            self.state.now,
        )
    }

    fn managed_vault(&self, caller: Address, handle: VaultHandle) -> ProtocolResult<ForeignPosition> {
        let vault = self.state.vaults.get(handle)?;
        if !vault.can_manage(caller) {
            return Err(ProtocolError::NotAuthorized {
                owner: vault.owner,
                delegate: caller,
            });
        }
        Ok(vault.clone())
    }
}

impl Stateful for Market {
    type Error = ProtocolError;

    fn snapshot(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(&self.state).map_err(|e| ProtocolError::Snapshot(e.to_string()))
    }

    fn restore(&mut self, snapshot: &[u8]) -> Result<(), Self::Error> {
        self.state =
            bincode::deserialize(snapshot).map_err(|e| ProtocolError::Snapshot(e.to_string()))?;
        Ok(())
    }
}

impl Clock for Market {
    fn now(&self) -> u64 {
        self.state.now
    }
}

impl TokenLedger for Market {
    fn balance_of(&self, asset: Asset, account: Address) -> u128 {
        self.state.tokens.balance(asset, account)
    }

    fn transfer(
        &mut self,
        asset: Asset,
        from: Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.state.tokens.move_tokens(asset, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        operator: Address,
        asset: Asset,
        from: Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        if operator != from && !self.state.tokens.is_approved(from, operator, asset) {
            return Err(ProtocolError::NotAuthorized {
                owner: from,
                delegate: operator,
            });
        }
        self.state.tokens.move_tokens(asset, from, to, amount)
    }

    fn approve(&mut self, owner: Address, operator: Address, asset: Asset, approved: bool) {
        self.state
            .tokens
            .set_approval(owner, operator, asset, approved);
    }

    fn is_approved(&self, owner: Address, operator: Address, asset: Asset) -> bool {
        self.state.tokens.is_approved(owner, operator, asset)
    }

    fn savings_rate(&self) -> u128 {
        self.state.tokens.savings_rate()
    }

    fn wrap_savings(&mut self, account: Address, base: u128) -> ProtocolResult<u128> {
        self.state.tokens.wrap(account, base)
    }

    fn unwrap_savings(&mut self, account: Address, units: u128) -> ProtocolResult<u128> {
        self.state.tokens.unwrap(account, units)
    }
}

impl PositionLedger for Market {
    fn ledger_address(&self) -> Address {
        self.state.positions.address
    }

    fn position_gate(&self) -> &AuthorizationGate {
        &self.state.positions.gate
    }

    fn position_gate_mut(&mut self) -> &mut AuthorizationGate {
        &mut self.state.positions.gate
    }

    fn collateral_price(&self, collateral: Collateral) -> u128 {
        match collateral {
            Collateral::Savings => self.state.tokens.savings_rate(),
            Collateral::Ether => self.state.positions.spot(collateral),
        }
    }

    fn posted(&self, collateral: Collateral, owner: Address) -> u128 {
        self.state.positions.posted(collateral, owner)
    }

    fn debt_claim(&self, collateral: Collateral, maturity: Maturity, owner: Address) -> u128 {
        self.state.positions.debt(collateral, maturity, owner)
    }

    fn debt_base(
        &self,
        collateral: Collateral,
        maturity: Maturity,
        owner: Address,
    ) -> ProtocolResult<u128> {
        let debt = self.state.positions.debt(collateral, maturity, owner);
        self.state
            .positions
            .debt_in_base(maturity, debt, self.state.now)
    }

    fn free_collateral(&self, collateral: Collateral, owner: Address) -> ProtocolResult<u128> {
        self.state.positions.free_collateral(
            collateral,
            owner,
            self.collateral_price(collateral),
            self.state.now,
        )
    }

    fn post(
        &mut self,
        payer: Address,
        collateral: Collateral,
        owner: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let custody = self.state.positions.address;
        self.state
            .tokens
            .move_tokens(Asset::Collateral(collateral), payer, custody, amount)?;
        let posted = self.posted(collateral, owner) + amount;
        self.state.positions.set_posted(collateral, owner, posted);
        debug!(?owner, %collateral, amount, "Collateral posted");
        Ok(())
    }

    fn withdraw(
        &mut self,
        auth: &Authorized,
        collateral: Collateral,
        receiver: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.state.positions.gate.verify(auth)?;
        if amount == 0 {
            return Ok(());
        }
        let owner = auth.owner();
        let posted = self.posted(collateral, owner);
        let remaining = posted
            .checked_sub(amount)
            .ok_or(ProtocolError::InsufficientLocalCollateral {
                requested: amount,
                available: posted,
            })?;
        self.ensure_position_safe(collateral, owner, remaining, None)?;

        let custody = self.state.positions.address;
        self.state
            .tokens
            .move_tokens(Asset::Collateral(collateral), custody, receiver, amount)?;
        self.state.positions.set_posted(collateral, owner, remaining);
        debug!(?owner, %collateral, amount, "Collateral withdrawn");
        Ok(())
    }

    fn borrow(
        &mut self,
        auth: &Authorized,
        collateral: Collateral,
        maturity: Maturity,
        receiver: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.state.positions.gate.verify(auth)?;
        if maturity.has_matured(self.state.now) {
            return Err(ProtocolError::MaturityElapsed);
        }
        if amount == 0 {
            return Ok(());
        }
        let owner = auth.owner();
        let debt = self
            .debt_claim(collateral, maturity, owner)
            .checked_add(amount)
            .ok_or(ProtocolError::Arithmetic("debt overflow"))?;
        let posted = self.posted(collateral, owner);
        self.ensure_position_safe(collateral, owner, posted, Some((maturity, debt)))?;

        self.state
            .tokens
            .credit(Asset::Claim(maturity), receiver, amount)?;
        self.state
            .positions
            .set_debt(collateral, maturity, owner, debt);
        debug!(?owner, %maturity, amount, "Claims borrowed");
        Ok(())
    }

    fn repay_claim(
        &mut self,
        payer: Address,
        collateral: Collateral,
        maturity: Maturity,
        owner: Address,
        amount: u128,
    ) -> ProtocolResult<u128> {
        let debt = self.debt_claim(collateral, maturity, owner);
        let used = amount.min(debt);
        self.state
            .tokens
            .debit(Asset::Claim(maturity), payer, used)?;
        self.state
            .positions
            .set_debt(collateral, maturity, owner, debt - used);
        debug!(?owner, %maturity, used, "Debt repaid in claims");
        Ok(used)
    }

    fn repay_base(
        &mut self,
        payer: Address,
        collateral: Collateral,
        maturity: Maturity,
        owner: Address,
        amount: u128,
    ) -> ProtocolResult<u128> {
        let debt = self.debt_claim(collateral, maturity, owner);
        let owed = self.debt_base(collateral, maturity, owner)?;
        let used = amount.min(owed);
        if used == 0 {
            return Ok(0);
        }
        let reduction = if used == owed {
            debt
        } else if maturity.has_matured(self.state.now) {
            mul_div(used, RAY, self.state.positions.rate_growth(maturity))?.min(debt)
        } else {
            used
        };

        let treasury = self.state.positions.treasury;
        self.state
            .tokens
            .move_tokens(Asset::Base, payer, treasury, used)?;
        self.state
            .positions
            .set_debt(collateral, maturity, owner, debt - reduction);
        debug!(?owner, %maturity, used, "Debt repaid in base");
        Ok(used)
    }

    fn redeem(
        &mut self,
        holder: Address,
        maturity: Maturity,
        amount: u128,
    ) -> ProtocolResult<u128> {
        let now = self.state.now;
        if !maturity.has_matured(now) {
            return Err(ProtocolError::NotMatured { maturity, now });
        }
        let treasury = self.state.positions.treasury;
        let available = self.state.tokens.balance(Asset::Base, treasury);
        if available < amount {
            return Err(ProtocolError::InsufficientBalance {
                asset: Asset::Base,
                account: treasury,
                required: amount,
                available,
            });
        }
        self.state
            .tokens
            .debit(Asset::Claim(maturity), holder, amount)?;
        self.state
            .tokens
            .move_tokens(Asset::Base, treasury, holder, amount)?;
        debug!(?holder, %maturity, amount, "Claims redeemed");
        Ok(amount)
    }
}

impl ForeignLedger for Market {
    fn vault(&self, handle: VaultHandle) -> ProtocolResult<&ForeignPosition> {
        self.state.vaults.get(handle)
    }

    fn vault_debt(&self, handle: VaultHandle) -> ProtocolResult<u128> {
        let vault = self.state.vaults.get(handle)?;
        self.state
            .vaults
            .to_base(vault.collateral, vault.normalized_debt)
    }

    fn base_to_settle(&self, handle: VaultHandle, normalized_debt: u128) -> ProtocolResult<u128> {
        let vault = self.state.vaults.get(handle)?;
        self.state.vaults.to_base(vault.collateral, normalized_debt)
    }

    fn can_manage(&self, handle: VaultHandle, who: Address) -> bool {
        self.state
            .vaults
            .get(handle)
            .map(|vault| vault.can_manage(who))
            .unwrap_or(false)
    }

    fn open_vault(&mut self, owner: Address, collateral: Collateral) -> VaultHandle {
        let handle = self.state.vaults.open(owner, collateral);
        debug!(%handle, ?owner, %collateral, "Foreign vault opened");
        handle
    }

    fn give_vault(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        new_owner: Address,
    ) -> ProtocolResult<()> {
        self.managed_vault(caller, handle)?;
        let vault = self.state.vaults.get_mut(handle)?;
        vault.owner = new_owner;
        vault.managers.clear();
        debug!(%handle, ?new_owner, "Foreign vault given");
        Ok(())
    }

    fn allow_vault(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        who: Address,
        allowed: bool,
    ) -> ProtocolResult<()> {
        let vault = self.state.vaults.get_mut(handle)?;
        if vault.owner != caller {
            return Err(ProtocolError::NotAuthorized {
                owner: vault.owner,
                delegate: caller,
            });
        }
        if allowed {
            vault.managers.insert(who);
        } else {
            vault.managers.remove(&who);
        }
        Ok(())
    }

    fn settle_vault(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        normalized_debt: u128,
        collateral: u128,
    ) -> ProtocolResult<u128> {
        let vault = self.managed_vault(caller, handle)?;
        let remaining_debt = vault.normalized_debt.checked_sub(normalized_debt).ok_or(
            ProtocolError::InsufficientForeignDebt {
                requested: normalized_debt,
                available: vault.normalized_debt,
            },
        )?;
        let remaining_locked =
            vault
                .locked
                .checked_sub(collateral)
                .ok_or(ProtocolError::InsufficientForeignCollateral {
                    requested: collateral,
                    available: vault.locked,
                })?;
        let vaults = &self.state.vaults;
        vaults.ensure_safe(vault.collateral, vault.owner, remaining_locked, remaining_debt)?;
        let base = vaults.to_base(vault.collateral, normalized_debt)?;
        let custody = vaults.address;

        self.state.tokens.debit(Asset::Base, caller, base)?;
        self.state.tokens.move_tokens(
            Asset::Collateral(vault.collateral),
            custody,
            caller,
            collateral,
        )?;
        let stored = self.state.vaults.get_mut(handle)?;
        stored.normalized_debt = remaining_debt;
        stored.locked = remaining_locked;
        debug!(%handle, base, collateral, "Foreign vault settled");
        Ok(base)
    }

    fn lock_and_draw(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        collateral: u128,
        base_out: u128,
    ) -> ProtocolResult<u128> {
        let vault = self.managed_vault(caller, handle)?;
        let vaults = &self.state.vaults;
        let added = vaults.to_normalized(vault.collateral, base_out)?;
        let locked = vault.locked + collateral;
        let normalized_debt = vault.normalized_debt + added;
        vaults.ensure_safe(vault.collateral, vault.owner, locked, normalized_debt)?;
        let custody = vaults.address;

        self.state.tokens.move_tokens(
            Asset::Collateral(vault.collateral),
            caller,
            custody,
            collateral,
        )?;
        self.state.tokens.credit(Asset::Base, caller, base_out)?;
        let stored = self.state.vaults.get_mut(handle)?;
        stored.locked = locked;
        stored.normalized_debt = normalized_debt;
        debug!(%handle, collateral, base_out, "Foreign vault drawn");
        Ok(added)
    }
}

impl PoolVenue for Market {
    fn pool(&self, id: PoolId) -> ProtocolResult<&PoolState> {
        Ok(&self.entry(id)?.state)
    }

    fn reserve_math(&self) -> &ReserveMath {
        &self.math
    }

    fn pool_gate(&self, id: PoolId) -> ProtocolResult<&AuthorizationGate> {
        Ok(&self.entry(id)?.gate)
    }

    fn pool_gate_mut(&mut self, id: PoolId) -> ProtocolResult<&mut AuthorizationGate> {
        Ok(&mut self.entry_mut(id)?.gate)
    }

    fn swap(
        &mut self,
        trader: Address,
        id: PoolId,
        kind: TradeKind,
        amount: u128,
    ) -> ProtocolResult<SwapFill> {
        let fill = self.preview(id, kind, amount)?;
        let mut next = self.entry(id)?.state.clone();
        next.apply_swap(&fill)?;
        let (pool, claim) = (next.address, Asset::Claim(next.maturity));

        let tokens = &mut self.state.tokens;
        tokens.move_tokens(Asset::Base, trader, pool, fill.base_in())?;
        tokens.move_tokens(claim, trader, pool, fill.claim_in())?;
        tokens.move_tokens(Asset::Base, pool, trader, fill.base_out())?;
        tokens.move_tokens(claim, pool, trader, fill.claim_out())?;
        self.entry_mut(id)?.state = next;

        debug!(
            %id,
            ?kind,
            amount,
            counter = fill.counter_amount,
            "Pool trade"
        );
        Ok(fill)
    }

    fn mint_liquidity(
        &mut self,
        provider: Address,
        id: PoolId,
        to: Address,
        base_offered: u128,
    ) -> ProtocolResult<MintQuote> {
        let pool = &self.entry(id)?.state;
        let quote = pool.preview_mint(base_offered)?;
        let (address, claim) = (pool.address, Asset::Claim(pool.maturity));

        let tokens = &mut self.state.tokens;
        tokens.move_tokens(Asset::Base, provider, address, quote.base_in)?;
        tokens.move_tokens(claim, provider, address, quote.claim_in)?;
        tokens.credit(Asset::Shares(id), to, quote.shares)?;
        self.entry_mut(id)?.state.apply_mint(&quote);

        debug!(%id, shares = quote.shares, base = quote.base_in, claims = quote.claim_in, "Liquidity minted");
        Ok(quote)
    }

    fn burn_liquidity(
        &mut self,
        auth: &Authorized,
        id: PoolId,
        shares: u128,
        to: Address,
    ) -> ProtocolResult<BurnQuote> {
        let entry = self.entry(id)?;
        entry.gate.verify(auth)?;
        let quote = entry.state.preview_burn(shares)?;
        let (address, claim) = (entry.state.address, Asset::Claim(entry.state.maturity));

        let tokens = &mut self.state.tokens;
        tokens.debit(Asset::Shares(id), auth.owner(), shares)?;
        tokens.move_tokens(Asset::Base, address, to, quote.base_out)?;
        tokens.move_tokens(claim, address, to, quote.claim_out)?;
        self.entry_mut(id)?.state.apply_burn(&quote);

        debug!(%id, shares, base = quote.base_out, claims = quote.claim_out, "Liquidity burned");
        Ok(quote)
    }
}

impl FlashLender for Market {
    fn flash_fee(&self, amount: u128) -> ProtocolResult<u128> {
        mul_div_up(amount, self.flash_fee_bps as u128, BPS)
    }

    fn flash_mint<B>(&mut self, pool: PoolId, amount: u128, borrower: &mut B) -> ProtocolResult<()>
    where
        B: FlashBorrower<Self> + ?Sized,
    {
        let (lender, maturity) = {
            let state = self.pool(pool)?;
            (state.claim_token, state.maturity)
        };
        let request = FlashRequest {
            pool,
            asset: Asset::Claim(maturity),
            amount,
            fee: self.flash_fee(amount)?,
            initiator: borrower.flash_address(),
        };

        self.state
            .tokens
            .credit(request.asset, request.initiator, amount)?;
        debug!(%pool, amount, fee = request.fee, "Flash mint issued");

        borrower.on_flash_loan(self, lender, &request)?;

        let owed = request.owed();
        let held = self.balance_of(request.asset, request.initiator);
        if held < owed {
            return Err(ProtocolError::InsufficientProceeds { owed, held });
        }
        self.state
            .tokens
            .debit(request.asset, request.initiator, owed)?;
        debug!(%pool, owed, "Flash mint settled");
        Ok(())
    }
}
