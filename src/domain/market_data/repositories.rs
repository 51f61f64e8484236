use crate::domain::market_data::{SessionSeed, Symbol};

/// Source of session baselines (daily open and projected range).
///
/// Consulted when a display subscribes to a symbol that has no state yet, so
/// the first display can render before the external session reset arrives.
pub trait SessionSeedRepository: Send + Sync {
    fn session_seed(&self, symbol: &Symbol) -> Option<SessionSeed>;
}

/// Repository that never knows a seed; sessions are seeded by `reset` only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSessionSeeds;

impl SessionSeedRepository for NoSessionSeeds {
    fn session_seed(&self, _symbol: &Symbol) -> Option<SessionSeed> {
        None
    }
}

/// Upstream tick source, one feed per watched symbol.
///
/// Implementations only start and stop delivery; reconnecting a dropped feed
/// is their own business and is reported back through the feed status calls
/// on the coordinator.
pub trait UpstreamFeed {
    fn open(&mut self, symbol: &Symbol);
    fn close(&mut self, symbol: &Symbol);
}

impl<F: UpstreamFeed + ?Sized> UpstreamFeed for Box<F> {
    fn open(&mut self, symbol: &Symbol) {
        (**self).open(symbol);
    }

    fn close(&mut self, symbol: &Symbol) {
        (**self).close(symbol);
    }
}
