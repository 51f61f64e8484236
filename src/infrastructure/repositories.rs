use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::market_data::{
    SessionRange, SessionSeed, SessionSeedRepository, Symbol, average_daily_range,
};

/// Session seeds kept in memory, filled by the host before displays open.
#[derive(Debug, Default)]
pub struct InMemorySeedRepository {
    seeds: RwLock<HashMap<Symbol, SessionSeed>>,
}

impl InMemorySeedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, symbol: Symbol, seed: SessionSeed) -> Option<SessionSeed> {
        self.seeds.write().insert(symbol, seed)
    }

    pub fn remove(&self, symbol: &Symbol) -> Option<SessionSeed> {
        self.seeds.write().remove(symbol)
    }

    /// Seed from the session open and the average range of recent sessions.
    ///
    /// Returns `Ok(None)` when the history has no usable session.
    pub fn insert_from_history(
        &self,
        symbol: Symbol,
        daily_open: f64,
        history: &[SessionRange],
        lookback: usize,
    ) -> DomainResult<Option<SessionSeed>> {
        let Some(projected_range) = average_daily_range(history, lookback) else {
            return Ok(None);
        };
        let seed = SessionSeed::new(daily_open, projected_range)?;
        self.insert(symbol, seed);
        Ok(Some(seed))
    }

    pub fn len(&self) -> usize {
        self.seeds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.read().is_empty()
    }
}

impl SessionSeedRepository for InMemorySeedRepository {
    fn session_seed(&self, symbol: &Symbol) -> Option<SessionSeed> {
        self.seeds.read().get(symbol).copied()
    }
}
