use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::application::config::EngineConfig;
use crate::application::symbol_store::SymbolStateStore;
use crate::domain::chart::DisplayId;
use crate::domain::errors::CoordinationError;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Symbol, UpstreamFeed};
use crate::domain::state::SnapshotCell;
use crate::{log_debug, log_info};

/// Proof of one display watching one symbol. Consumed by `unsubscribe`.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
    display_id: DisplayId,
    symbol: Symbol,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn display_id(&self) -> &DisplayId {
        &self.display_id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
}

#[derive(Debug, Default)]
struct FeedEntry {
    refcount: usize,
    close_deadline: Option<u64>,
}

/// Symbol to displays fan-out with reference-counted upstream feeds.
///
/// A feed is opened by the first subscriber and closed `unsubscribe_grace_ms`
/// after the last one leaves; a subscriber arriving inside that window takes
/// over the still-open feed.
pub struct SubscriptionRegistry<F: UpstreamFeed> {
    store: Arc<SymbolStateStore>,
    feed: F,
    grace_ms: u64,
    feeds: HashMap<Symbol, FeedEntry>,
    live: HashSet<u64>,
    next_id: u64,
}

impl<F: UpstreamFeed> SubscriptionRegistry<F> {
    pub fn new(store: Arc<SymbolStateStore>, feed: F, config: &EngineConfig) -> Self {
        Self {
            store,
            feed,
            grace_ms: config.unsubscribe_grace_ms,
            feeds: HashMap::new(),
            live: HashSet::new(),
            next_id: 1,
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    /// Start watching `symbol` for `display_id`; returns the symbol's cell.
    pub fn subscribe(
        &mut self,
        display_id: DisplayId,
        symbol: &Symbol,
    ) -> (SubscriptionHandle, Arc<SnapshotCell>) {
        let cell = self.store.ensure_seeded(symbol);

        if !self.feeds.contains_key(symbol) {
            log_info!(LogComponent::Application("Subscriptions"), "📡 Opening feed for {}", symbol);
            self.feed.open(symbol);
        }
        let entry = self.feeds.entry(symbol.clone()).or_default();
        if entry.close_deadline.take().is_some() {
            log_debug!(
                LogComponent::Application("Subscriptions"),
                "Cancelled pending close of {}",
                symbol
            );
        }
        entry.refcount += 1;

        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id);
        (SubscriptionHandle { id, display_id, symbol: symbol.clone() }, cell)
    }

    /// Stop watching. The last unsubscribe schedules the feed close.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Result<(), CoordinationError> {
        if !self.live.remove(&handle.id) {
            return Err(CoordinationError::UnknownSubscription(handle.id));
        }
        let now = self.store.now();
        let Some(entry) = self.feeds.get_mut(&handle.symbol) else {
            return Ok(());
        };
        entry.refcount = entry.refcount.saturating_sub(1);
        if entry.refcount == 0 {
            if self.grace_ms == 0 {
                self.close_feed(&handle.symbol);
            } else {
                entry.close_deadline = Some(now + self.grace_ms);
                log_debug!(
                    LogComponent::Application("Subscriptions"),
                    "Feed for {} closes in {}ms unless resubscribed",
                    handle.symbol,
                    self.grace_ms
                );
            }
        }
        Ok(())
    }

    /// Close every feed whose grace period ended at or before `now`.
    pub fn poll_expired(&mut self, now: u64) -> Vec<Symbol> {
        let mut expired: Vec<Symbol> = self
            .feeds
            .iter()
            .filter(|(_, entry)| {
                entry.refcount == 0 && entry.close_deadline.is_some_and(|at| at <= now)
            })
            .map(|(symbol, _)| symbol.clone())
            .collect();
        expired.sort();
        for symbol in &expired {
            self.close_feed(symbol);
        }
        expired
    }

    fn close_feed(&mut self, symbol: &Symbol) {
        if self.feeds.remove(symbol).is_some() {
            log_info!(LogComponent::Application("Subscriptions"), "Closing feed for {}", symbol);
            self.feed.close(symbol);
        }
    }

    /// Transport lost the symbol. Displays keep their subscription and go stale.
    pub fn mark_feed_disconnected(&self, symbol: &Symbol) -> bool {
        self.store.set_feed_connected(symbol, false)
    }

    pub fn mark_feed_connected(&self, symbol: &Symbol) -> bool {
        self.store.set_feed_connected(symbol, true)
    }

    pub fn refcount(&self, symbol: &Symbol) -> usize {
        self.feeds.get(symbol).map_or(0, |entry| entry.refcount)
    }

    pub fn is_feed_open(&self, symbol: &Symbol) -> bool {
        self.feeds.contains_key(symbol)
    }

    pub fn is_observed(&self, symbol: &Symbol) -> bool {
        self.refcount(symbol) > 0
    }

    pub fn active_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .feeds
            .iter()
            .filter(|(_, entry)| entry.refcount > 0)
            .map(|(s, _)| s.clone())
            .collect();
        symbols.sort();
        symbols
    }

    pub fn open_feed_count(&self) -> usize {
        self.feeds.len()
    }
}
