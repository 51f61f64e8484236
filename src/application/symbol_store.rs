use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use crate::application::config::EngineConfig;
use crate::domain::errors::{ConfigurationError, DomainResult};
use crate::domain::events::{EventDispatcher, InMemoryEventDispatcher, MarketDataEvent};
use crate::domain::logging::{LogComponent, TimeProvider};
use crate::domain::market_data::{
    NoSessionSeeds, Price, RangeCalculator, SessionSeed, SessionSeedRepository, Symbol, SymbolState,
    Tick, TickRejection, Timestamp,
};
use crate::domain::state::SnapshotCell;
use crate::{log_debug, log_info};

pub type ApplyResult = Result<Arc<SymbolState>, TickRejection>;

/// Counter snapshot returned by [`SymbolStateStore::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub accepted: u64,
    pub duplicates: u64,
    pub invalid_price: u64,
    pub invalid_symbol: u64,
    pub unknown_symbol: u64,
    pub unseeded: u64,
    pub out_of_order: u64,
    pub resets: u64,
    pub cas_retries: u64,
    pub evicted: u64,
}

impl IngestStats {
    pub fn rejected(&self) -> u64 {
        self.invalid_price
            + self.invalid_symbol
            + self.unknown_symbol
            + self.unseeded
            + self.out_of_order
    }
}

#[derive(Debug, Default)]
struct IngestCounters {
    accepted: AtomicU64,
    duplicates: AtomicU64,
    invalid_price: AtomicU64,
    invalid_symbol: AtomicU64,
    unknown_symbol: AtomicU64,
    unseeded: AtomicU64,
    out_of_order: AtomicU64,
    resets: AtomicU64,
    cas_retries: AtomicU64,
    evicted: AtomicU64,
}

impl IngestCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn count_rejection(&self, rejection: &TickRejection) {
        let counter = match rejection {
            TickRejection::InvalidPrice { .. } => &self.invalid_price,
            TickRejection::InvalidSymbol { .. } => &self.invalid_symbol,
            TickRejection::UnknownSymbol { .. } => &self.unknown_symbol,
            TickRejection::Unseeded { .. } => &self.unseeded,
            TickRejection::OutOfOrder { .. } => &self.out_of_order,
        };
        Self::bump(counter);
    }

    fn snapshot(&self) -> IngestStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        IngestStats {
            accepted: load(&self.accepted),
            duplicates: load(&self.duplicates),
            invalid_price: load(&self.invalid_price),
            invalid_symbol: load(&self.invalid_symbol),
            unknown_symbol: load(&self.unknown_symbol),
            unseeded: load(&self.unseeded),
            out_of_order: load(&self.out_of_order),
            resets: load(&self.resets),
            cas_retries: load(&self.cas_retries),
            evicted: load(&self.evicted),
        }
    }
}

/// Outcome of [`SymbolStateStore::apply_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub symbols: usize,
}

/// Single writer for every [`SymbolState`].
///
/// Each accepted tick builds a new immutable snapshot from the current one and
/// installs it with compare-and-swap on the symbol's [`SnapshotCell`]; a lost
/// race rebuilds from the winner's snapshot, so a concurrent `reset` is never
/// overwritten by a tick computed against the previous session.
///
/// A symbol gets its cell on the first subscription or on the first tick,
/// whichever comes first; either way the session is seeded from the
/// [`SessionSeedRepository`] when it knows the symbol.
pub struct SymbolStateStore {
    cells: RwLock<HashMap<Symbol, Arc<SnapshotCell>>>,
    seeds: RwLock<Arc<dyn SessionSeedRepository>>,
    calculator: RangeCalculator,
    out_of_order_tolerance_ms: u64,
    idle_evict_after_ms: u64,
    clock: Arc<dyn TimeProvider>,
    counters: IngestCounters,
    events: InMemoryEventDispatcher<MarketDataEvent>,
}

impl SymbolStateStore {
    pub fn new(
        config: &EngineConfig,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            cells: RwLock::new(HashMap::new()),
            seeds: RwLock::new(Arc::new(NoSessionSeeds)),
            calculator: config.range_calculator()?,
            out_of_order_tolerance_ms: config.out_of_order_tolerance_ms,
            idle_evict_after_ms: config.idle_evict_after_ms,
            clock,
            counters: IngestCounters::default(),
            events: InMemoryEventDispatcher::new(),
        })
    }

    /// Источник сессионных базовых значений для новых символов
    pub fn set_seeds(&self, seeds: Arc<dyn SessionSeedRepository>) {
        *self.seeds.write() = seeds;
    }

    fn repository_seed(&self, symbol: &Symbol) -> Option<SessionSeed> {
        self.seeds.read().session_seed(symbol)
    }

    pub fn calculator(&self) -> &RangeCalculator {
        &self.calculator
    }

    pub fn now(&self) -> u64 {
        self.clock.current_timestamp()
    }

    /// Register a listener for store events. Runs on the writer's thread.
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(&MarketDataEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
    }

    /// Cell for `symbol`, created unseeded if absent.
    pub fn ensure(&self, symbol: &Symbol) -> Arc<SnapshotCell> {
        if let Some(cell) = self.cells.read().get(symbol) {
            return Arc::clone(cell);
        }
        let created_at = Timestamp::from_millis(self.now());
        let mut cells = self.cells.write();
        let cell = cells.entry(symbol.clone()).or_insert_with(|| {
            log_debug!(
                LogComponent::Application("SymbolStore"),
                "Created state cell for {}",
                symbol
            );
            Arc::new(SnapshotCell::new(symbol.clone(), created_at))
        });
        Arc::clone(cell)
    }

    /// Cell for `symbol`, seeded from the repository if it has no session yet.
    pub fn ensure_seeded(&self, symbol: &Symbol) -> Arc<SnapshotCell> {
        let cell = self.ensure(symbol);
        if !cell.is_seeded() {
            if let Some(seed) = self.repository_seed(symbol) {
                self.seed_if_unseeded(symbol, &seed);
            }
        }
        cell
    }

    pub fn cell(&self, symbol: &Symbol) -> Option<Arc<SnapshotCell>> {
        self.cells.read().get(symbol).cloned()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<Arc<SymbolState>> {
        self.cell(symbol).and_then(|cell| cell.load())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.cells.read().contains_key(symbol)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.cells.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Apply a raw tick from the transport.
    pub fn apply(&self, symbol: &str, price: f64, timestamp: u64) -> ApplyResult {
        match Symbol::new(symbol) {
            Ok(symbol) => self.apply_to(&symbol, price, timestamp),
            Err(_) => Err(self.reject(TickRejection::InvalidSymbol { symbol: symbol.to_string() })),
        }
    }

    pub fn apply_tick(&self, tick: &Tick) -> ApplyResult {
        self.apply_to(&tick.symbol, tick.price.value(), tick.timestamp.value())
    }

    fn apply_to(&self, symbol: &Symbol, price: f64, timestamp: u64) -> ApplyResult {
        let price = match Price::validated(price) {
            Ok(price) => price,
            Err(_) => {
                let symbol = symbol.to_string();
                return Err(self.reject(TickRejection::InvalidPrice { symbol, price }));
            }
        };
        let cell = match self.cell(symbol) {
            Some(cell) if cell.is_seeded() => cell,
            Some(_) => self.ensure_seeded(symbol),
            None if self.repository_seed(symbol).is_some() => self.ensure_seeded(symbol),
            None => {
                return Err(self.reject(TickRejection::UnknownSymbol { symbol: symbol.clone() }));
            }
        };
        self.apply_on_cell(&cell, symbol, price, Timestamp::from_millis(timestamp))
    }

    fn apply_on_cell(
        &self,
        cell: &Arc<SnapshotCell>,
        symbol: &Symbol,
        price: Price,
        timestamp: Timestamp,
    ) -> ApplyResult {
        let mut current = cell.load();
        loop {
            let Some(state) = current else {
                return Err(self.reject(TickRejection::Unseeded { symbol: symbol.clone() }));
            };
            if state.is_duplicate(price, timestamp) {
                IngestCounters::bump(&self.counters.duplicates);
                return Ok(state);
            }
            let oldest_allowed =
                state.last_update_time.value().saturating_sub(self.out_of_order_tolerance_ms);
            if timestamp.value() < oldest_allowed {
                return Err(self.reject(TickRejection::OutOfOrder {
                    symbol: symbol.clone(),
                    timestamp: timestamp.value(),
                    last_update_time: state.last_update_time.value(),
                }));
            }
            // redelivered late tick: extrema already cover it
            if state.is_covered_late_tick(price, timestamp) {
                IngestCounters::bump(&self.counters.duplicates);
                return Ok(state);
            }

            let received_at = Timestamp::from_millis(self.now());
            let next = Arc::new(state.with_tick(price, timestamp, received_at, &self.calculator));
            match cell.compare_and_swap(Some(&state), Arc::clone(&next)) {
                Ok(()) => {
                    if !self.is_live_cell(symbol, cell) {
                        // evicted while this tick was in flight
                        let rejection = TickRejection::UnknownSymbol { symbol: symbol.clone() };
                        return Err(self.reject(rejection));
                    }
                    IngestCounters::bump(&self.counters.accepted);
                    let snapshot = Arc::clone(&next);
                    self.events.publish(MarketDataEvent::SnapshotPublished { snapshot });
                    return Ok(next);
                }
                Err(latest) => {
                    IngestCounters::bump(&self.counters.cas_retries);
                    current = latest;
                }
            }
        }
    }

    fn is_live_cell(&self, symbol: &Symbol, cell: &Arc<SnapshotCell>) -> bool {
        self.cells.read().get(symbol).is_some_and(|live| Arc::ptr_eq(live, cell))
    }

    /// Apply many ticks. Per-symbol order is preserved; with the `parallel`
    /// feature different symbols are applied concurrently.
    pub fn apply_batch(&self, ticks: &[Tick]) -> BatchSummary {
        let mut index: HashMap<&Symbol, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Tick>> = Vec::new();
        for tick in ticks {
            let slot = *index.entry(&tick.symbol).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(tick);
        }

        let apply_group = |group: &Vec<&Tick>| -> (usize, usize) {
            group.iter().fold((0, 0), |(ok, rejected), tick| match self.apply_tick(tick) {
                Ok(_) => (ok + 1, rejected),
                Err(_) => (ok, rejected + 1),
            })
        };

        #[cfg(feature = "parallel")]
        let (accepted, rejected) = {
            use rayon::prelude::*;
            groups.par_iter().map(apply_group).reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
        };
        #[cfg(not(feature = "parallel"))]
        let (accepted, rejected) =
            groups.iter().map(apply_group).fold((0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

        BatchSummary { accepted, rejected, symbols: groups.len() }
    }

    /// Start a new session for `symbol`, discarding prior extrema.
    pub fn reset(
        &self,
        symbol: &Symbol,
        daily_open: f64,
        projected_range: f64,
    ) -> DomainResult<Arc<SymbolState>> {
        let seed = SessionSeed::new(daily_open, projected_range)?;
        Ok(self.install_seed(symbol, &seed))
    }

    /// Seed a cell that has no session yet; an existing session is kept.
    pub fn seed_if_unseeded(&self, symbol: &Symbol, seed: &SessionSeed) -> Arc<SymbolState> {
        let cell = self.ensure(symbol);
        let fresh = Arc::new(self.seeded_state(symbol, seed, None));
        match cell.compare_and_swap(None, Arc::clone(&fresh)) {
            Ok(()) => {
                IngestCounters::bump(&self.counters.resets);
                self.events.publish(MarketDataEvent::SessionReset { snapshot: Arc::clone(&fresh) });
                fresh
            }
            Err(Some(existing)) => existing,
            // A cell never goes back to unseeded, so a conflict always carries a value.
            Err(None) => self.install_seed(symbol, seed),
        }
    }

    fn install_seed(&self, symbol: &Symbol, seed: &SessionSeed) -> Arc<SymbolState> {
        let cell = self.ensure(symbol);
        let mut current = cell.load();
        loop {
            let next = Arc::new(self.seeded_state(symbol, seed, current.as_deref()));
            match cell.compare_and_swap(current.as_ref(), Arc::clone(&next)) {
                Ok(()) => {
                    IngestCounters::bump(&self.counters.resets);
                    log_info!(
                        LogComponent::Application("SymbolStore"),
                        "🔄 Session {} for {}: open={} range={}",
                        next.session,
                        symbol,
                        seed.daily_open,
                        seed.projected_range
                    );
                    let snapshot = Arc::clone(&next);
                    self.events.publish(MarketDataEvent::SessionReset { snapshot });
                    return next;
                }
                Err(latest) => {
                    IngestCounters::bump(&self.counters.cas_retries);
                    current = latest;
                }
            }
        }
    }

    fn seeded_state(
        &self,
        symbol: &Symbol,
        seed: &SessionSeed,
        previous: Option<&SymbolState>,
    ) -> SymbolState {
        SymbolState::seeded(
            symbol.clone(),
            seed,
            self.calculator.initial_scale(),
            previous,
            Timestamp::from_millis(self.now()),
        )
    }

    /// Flag the upstream feed of `symbol`. Returns false for an unknown symbol.
    pub fn set_feed_connected(&self, symbol: &Symbol, connected: bool) -> bool {
        let Some(cell) = self.cell(symbol) else {
            return false;
        };
        if cell.set_feed_connected(connected) != connected {
            let symbol = symbol.clone();
            self.events.publish(MarketDataEvent::FeedStatusChanged { symbol, connected });
        }
        true
    }

    /// Drop cells nobody observes and nothing has touched for the idle window.
    pub fn evict_idle<F>(&self, now: u64, is_observed: F) -> Vec<Symbol>
    where
        F: Fn(&Symbol) -> bool,
    {
        let mut evicted = Vec::new();
        {
            let mut cells = self.cells.write();
            cells.retain(|symbol, cell| {
                let idle = cell.last_activity().elapsed_until(now) >= self.idle_evict_after_ms;
                let keep = !idle || is_observed(symbol);
                if !keep {
                    evicted.push(symbol.clone());
                }
                keep
            });
        }
        evicted.sort();
        for symbol in &evicted {
            IngestCounters::bump(&self.counters.evicted);
            log_debug!(LogComponent::Application("SymbolStore"), "Evicted idle symbol {}", symbol);
            self.events.publish(MarketDataEvent::SymbolEvicted { symbol: symbol.clone() });
        }
        evicted
    }

    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }

    fn reject(&self, rejection: TickRejection) -> TickRejection {
        self.counters.count_rejection(&rejection);
        log_debug!(LogComponent::Application("SymbolStore"), "Tick rejected: {}", rejection);
        self.events.publish(MarketDataEvent::TickRejected { rejection: rejection.clone() });
        rejection
    }
}
