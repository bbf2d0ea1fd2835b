//! Flash-mint request and borrower callback

use tenor_types::{Address, Asset, PoolId, ProtocolResult};

/// Terms of one flash mint, handed to the borrower's callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRequest {
    /// Pool whose claim token issued the loan
    pub pool: PoolId,
    pub asset: Asset,
    pub amount: u128,
    pub fee: u128,
    /// Account the claims were minted to
    pub initiator: Address,
}

impl FlashRequest {
    /// What the lender burns from the initiator once the callback returns
    pub fn owed(&self) -> u128 {
        self.amount.saturating_add(self.fee)
    }
}

/// Receives flash-minted claims and must hold `owed()` when it returns
pub trait FlashBorrower<E: ?Sized> {
    /// Account that receives the loan
    fn flash_address(&self) -> Address;

    /// `lender` identifies the issuing claim token
    fn on_flash_loan(
        &mut self,
        env: &mut E,
        lender: Address,
        request: &FlashRequest,
    ) -> ProtocolResult<()>;
}
