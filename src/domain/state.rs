use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;

use crate::domain::market_data::{Symbol, SymbolState, Timestamp};

/// Shared slot holding the latest published snapshot of one symbol.
///
/// Readers take the current `Arc` without locking and never see a snapshot
/// that is still being built. Writers prepare the next snapshot on their own
/// and install it with [`SnapshotCell::compare_and_swap`].
#[derive(Debug)]
pub struct SnapshotCell {
    symbol: Symbol,
    current: ArcSwapOption<SymbolState>,
    feed_connected: AtomicBool,
    created_at: Timestamp,
}

impl SnapshotCell {
    pub fn new(symbol: Symbol, created_at: Timestamp) -> Self {
        Self {
            symbol,
            current: ArcSwapOption::empty(),
            feed_connected: AtomicBool::new(true),
            created_at,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Latest snapshot, `None` until the session is seeded.
    pub fn load(&self) -> Option<Arc<SymbolState>> {
        self.current.load_full()
    }

    pub fn is_seeded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Install `new` if the slot still holds `expected` (pointer equality).
    ///
    /// On conflict the current value is returned so the caller can rebuild
    /// from it and retry.
    pub fn compare_and_swap(
        &self,
        expected: Option<&Arc<SymbolState>>,
        new: Arc<SymbolState>,
    ) -> Result<(), Option<Arc<SymbolState>>> {
        let expected = expected.cloned();
        let previous = self.current.compare_and_swap(&expected, Some(new));
        let unchanged = match ((*previous).as_ref(), expected.as_ref()) {
            (None, None) => true,
            (Some(current), Some(expected)) => Arc::ptr_eq(current, expected),
            _ => false,
        };
        if unchanged { Ok(()) } else { Err((*previous).clone()) }
    }

    pub fn is_feed_connected(&self) -> bool {
        self.feed_connected.load(Ordering::Acquire)
    }

    /// Returns the previous flag.
    pub fn set_feed_connected(&self, connected: bool) -> bool {
        self.feed_connected.swap(connected, Ordering::AcqRel)
    }

    /// Local-clock time of the last accepted tick or reset, or creation time.
    pub fn last_activity(&self) -> Timestamp {
        self.load().map(|state| state.received_at).unwrap_or(self.created_at)
    }
}
