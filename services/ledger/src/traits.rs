//! Collaborator traits
//!
//! The proxies are written against these traits only. Each maps onto one
//! external system: token balances, the position ledger, the foreign
//! ledger, the pool venue and the claim flash-mint primitive.

use crate::{AuthorizationGate, Authorized, FlashBorrower, ForeignPosition, SignedAuthorization};
use tenor_amm::{BurnQuote, CurvePool, MintQuote, PoolState, ReserveMath, SwapFill, TradeKind};
use tenor_types::{Address, Asset, Collateral, Maturity, PoolId, ProtocolResult, VaultHandle};

/// Components whose full state can be captured and put back
pub trait Stateful {
    /// Error type for failed snapshot or restore
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a snapshot of the current state
    fn snapshot(&self) -> Result<Vec<u8>, Self::Error>;

    /// Restore state from a snapshot
    fn restore(&mut self, snapshot: &[u8]) -> Result<(), Self::Error>;
}

/// Source of the current timestamp in seconds
pub trait Clock {
    fn now(&self) -> u64;
}

/// Fungible balances, operator approvals and the savings wrapper
pub trait TokenLedger {
    fn balance_of(&self, asset: Asset, account: Address) -> u128;

    fn transfer(
        &mut self,
        asset: Asset,
        from: Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()>;

    /// Move `from`'s tokens on their behalf; `operator` must be approved
    fn transfer_from(
        &mut self,
        operator: Address,
        asset: Asset,
        from: Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()>;

    fn approve(&mut self, owner: Address, operator: Address, asset: Asset, approved: bool);

    fn is_approved(&self, owner: Address, operator: Address, asset: Asset) -> bool;

    /// Base currency per savings unit, in RAY
    fn savings_rate(&self) -> u128;

    /// Wrap base into savings units, returning the units minted
    fn wrap_savings(&mut self, account: Address, base: u128) -> ProtocolResult<u128>;

    /// Unwrap savings units into base, returning the base released
    fn unwrap_savings(&mut self, account: Address, units: u128) -> ProtocolResult<u128>;
}

/// Collateralized claim debt per (collateral, maturity, owner)
pub trait PositionLedger: Clock {
    /// Account holding posted collateral
    fn ledger_address(&self) -> Address;

    fn position_gate(&self) -> &AuthorizationGate;

    fn position_gate_mut(&mut self) -> &mut AuthorizationGate;

    /// Value of one collateral unit in base, in RAY
    fn collateral_price(&self, collateral: Collateral) -> u128;

    fn posted(&self, collateral: Collateral, owner: Address) -> u128;

    /// Outstanding debt in claim units
    fn debt_claim(&self, collateral: Collateral, maturity: Maturity, owner: Address) -> u128;

    /// Outstanding debt in base, including post-maturity growth
    fn debt_base(
        &self,
        collateral: Collateral,
        maturity: Maturity,
        owner: Address,
    ) -> ProtocolResult<u128>;

    /// Posted collateral not backing any debt
    fn free_collateral(&self, collateral: Collateral, owner: Address) -> ProtocolResult<u128>;

    /// Move collateral from `payer` into `owner`'s position
    fn post(
        &mut self,
        payer: Address,
        collateral: Collateral,
        owner: Address,
        amount: u128,
    ) -> ProtocolResult<()>;

    fn withdraw(
        &mut self,
        auth: &Authorized,
        collateral: Collateral,
        receiver: Address,
        amount: u128,
    ) -> ProtocolResult<()>;

    /// Open claim debt for the authorized owner and mint the claims to `receiver`
    fn borrow(
        &mut self,
        auth: &Authorized,
        collateral: Collateral,
        maturity: Maturity,
        receiver: Address,
        amount: u128,
    ) -> ProtocolResult<()>;

    /// Burn up to `amount` of `payer`'s claims against `owner`'s debt,
    /// returning the claims used
    fn repay_claim(
        &mut self,
        payer: Address,
        collateral: Collateral,
        maturity: Maturity,
        owner: Address,
        amount: u128,
    ) -> ProtocolResult<u128>;

    /// Pay up to `amount` base against `owner`'s debt, returning the base used
    fn repay_base(
        &mut self,
        payer: Address,
        collateral: Collateral,
        maturity: Maturity,
        owner: Address,
        amount: u128,
    ) -> ProtocolResult<u128>;

    /// Redeem matured claims 1:1 for base
    fn redeem(&mut self, holder: Address, maturity: Maturity, amount: u128)
        -> ProtocolResult<u128>;

    /// Resolve `delegate`'s right to act for `owner` on this ledger
    fn authorize_position(
        &mut self,
        owner: Address,
        delegate: Address,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<Authorized> {
        let now = self.now();
        self.position_gate_mut()
            .authorize(owner, delegate, signature, now)
    }
}

/// Vault-style positions on the foreign lending ledger
pub trait ForeignLedger {
    fn vault(&self, handle: VaultHandle) -> ProtocolResult<&ForeignPosition>;

    /// Outstanding debt in base, rounded up
    fn vault_debt(&self, handle: VaultHandle) -> ProtocolResult<u128>;

    /// Base needed to clear `normalized_debt` of the vault's debt
    fn base_to_settle(&self, handle: VaultHandle, normalized_debt: u128) -> ProtocolResult<u128>;

    fn can_manage(&self, handle: VaultHandle, who: Address) -> bool;

    fn open_vault(&mut self, owner: Address, collateral: Collateral) -> VaultHandle;

    fn give_vault(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        new_owner: Address,
    ) -> ProtocolResult<()>;

    fn allow_vault(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        who: Address,
        allowed: bool,
    ) -> ProtocolResult<()>;

    /// Pay the caller's base against `normalized_debt` and free `collateral`
    /// to the caller, returning the base paid
    fn settle_vault(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        normalized_debt: u128,
        collateral: u128,
    ) -> ProtocolResult<u128>;

    /// Lock the caller's collateral and draw exactly `base_out`, returning
    /// the normalized debt added
    fn lock_and_draw(
        &mut self,
        caller: Address,
        handle: VaultHandle,
        collateral: u128,
        base_out: u128,
    ) -> ProtocolResult<u128>;
}

/// Curve-priced pools trading base against one maturity's claims
pub trait PoolVenue: Clock {
    fn pool(&self, id: PoolId) -> ProtocolResult<&PoolState>;

    fn reserve_math(&self) -> &ReserveMath;

    fn pool_gate(&self, id: PoolId) -> ProtocolResult<&AuthorizationGate>;

    fn pool_gate_mut(&mut self, id: PoolId) -> ProtocolResult<&mut AuthorizationGate>;

    /// Execute a trade for `trader`, moving tokens both ways
    fn swap(
        &mut self,
        trader: Address,
        id: PoolId,
        kind: TradeKind,
        amount: u128,
    ) -> ProtocolResult<SwapFill>;

    /// Deposit base (and proportional claims) from `provider`, crediting
    /// shares to `to`
    fn mint_liquidity(
        &mut self,
        provider: Address,
        id: PoolId,
        to: Address,
        base_offered: u128,
    ) -> ProtocolResult<MintQuote>;

    /// Burn the authorized owner's shares and send the reserves to `to`
    fn burn_liquidity(
        &mut self,
        auth: &Authorized,
        id: PoolId,
        shares: u128,
        to: Address,
    ) -> ProtocolResult<BurnQuote>;

    /// Price a trade without executing it
    fn preview(&self, id: PoolId, kind: TradeKind, amount: u128) -> ProtocolResult<SwapFill> {
        self.pool(id)?
            .quote(self.reserve_math(), self.now(), kind, amount)
    }

    fn quote_sell_base(&self, id: PoolId, base_in: u128) -> ProtocolResult<u128> {
        Ok(self.preview(id, TradeKind::SellBase, base_in)?.counter_amount)
    }

    fn quote_buy_base(&self, id: PoolId, base_out: u128) -> ProtocolResult<u128> {
        Ok(self.preview(id, TradeKind::BuyBase, base_out)?.counter_amount)
    }

    fn quote_sell_claim(&self, id: PoolId, claim_in: u128) -> ProtocolResult<u128> {
        Ok(self.preview(id, TradeKind::SellClaim, claim_in)?.counter_amount)
    }

    fn quote_buy_claim(&self, id: PoolId, claim_out: u128) -> ProtocolResult<u128> {
        Ok(self.preview(id, TradeKind::BuyClaim, claim_out)?.counter_amount)
    }

    /// Returns claims received
    fn sell_base(&mut self, trader: Address, id: PoolId, base_in: u128) -> ProtocolResult<u128> {
        Ok(self.swap(trader, id, TradeKind::SellBase, base_in)?.claim_out())
    }

    /// Returns claims paid
    fn buy_base(&mut self, trader: Address, id: PoolId, base_out: u128) -> ProtocolResult<u128> {
        Ok(self.swap(trader, id, TradeKind::BuyBase, base_out)?.claim_in())
    }

    /// Returns base received
    fn sell_claim(&mut self, trader: Address, id: PoolId, claim_in: u128) -> ProtocolResult<u128> {
        Ok(self.swap(trader, id, TradeKind::SellClaim, claim_in)?.base_out())
    }

    /// Returns base paid
    fn buy_claim(&mut self, trader: Address, id: PoolId, claim_out: u128) -> ProtocolResult<u128> {
        Ok(self.swap(trader, id, TradeKind::BuyClaim, claim_out)?.base_in())
    }

    /// Resolve `delegate`'s right to act for `owner` on a pool
    fn authorize_pool(
        &mut self,
        id: PoolId,
        owner: Address,
        delegate: Address,
        signature: Option<&SignedAuthorization>,
    ) -> ProtocolResult<Authorized> {
        let now = self.now();
        self.pool_gate_mut(id)?
            .authorize(owner, delegate, signature, now)
    }
}

/// Flash-mints a pool's claims within one call
///
/// The borrower must hold `amount + fee` of the claim when its callback
/// returns; the lender burns that much. Tokens minted before a failed
/// callback are only unwound by the enclosing atomic unit.
pub trait FlashLender: Sized {
    /// Claims charged on top of `amount`
    fn flash_fee(&self, amount: u128) -> ProtocolResult<u128>;

    fn flash_mint<B>(&mut self, pool: PoolId, amount: u128, borrower: &mut B) -> ProtocolResult<()>
    where
        B: FlashBorrower<Self> + ?Sized;
}

/// Everything a proxy needs from the outside world
pub trait Environment:
    Clock + TokenLedger + PositionLedger + ForeignLedger + PoolVenue + FlashLender
{
}

impl<T> Environment for T where
    T: Clock + TokenLedger + PositionLedger + ForeignLedger + PoolVenue + FlashLender
{
}

