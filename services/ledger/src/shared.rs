//! Market shared between threads
//!
//! Every unit of work runs under the lock and inside [`Market::atomic`], so
//! concurrent callers observe units either fully applied or not at all.

use crate::Market;
use parking_lot::Mutex;
use std::sync::Arc;
use tenor_types::ProtocolResult;

#[derive(Debug, Clone)]
pub struct SharedMarket {
    inner: Arc<Mutex<Market>>,
}

impl SharedMarket {
    pub fn new(market: Market) -> Self {
        Self {
            inner: Arc::new(Mutex::new(market)),
        }
    }

    /// Run `unit` atomically with exclusive access to the market
    pub fn execute<T>(&self, unit: impl FnOnce(&mut Market) -> ProtocolResult<T>) -> ProtocolResult<T> {
        let mut market = self.inner.lock();
        market.atomic(unit)
    }

    /// Read-only access, for queries and assertions
    pub fn read<T>(&self, query: impl FnOnce(&Market) -> T) -> T {
        let market = self.inner.lock();
        query(&market)
    }
}
