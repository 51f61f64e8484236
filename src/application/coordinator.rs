use std::sync::Arc;

use serde::Serialize;

use crate::application::config::EngineConfig;
use crate::application::render_coordinator::{DrawingSink, RenderCoordinator};
use crate::application::subscription_registry::SubscriptionRegistry;
use crate::application::symbol_store::{ApplyResult, BatchSummary, IngestStats, SymbolStateStore};
use crate::domain::chart::{CanvasGeometry, DisplayId};
use crate::domain::errors::{AppResult, CoordinationError};
use crate::domain::events::{ChartEvent, EventDispatcher, InMemoryEventDispatcher, MarketDataEvent};
use crate::domain::logging::{LogComponent, TimeProvider, get_logger};
use crate::domain::market_data::{SessionSeedRepository, Symbol, SymbolState, Tick, UpstreamFeed};
use crate::ecs::{EcsWorld, systems};
use crate::log_debug;

/// Итог периодического обслуживания
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub closed_feeds: Vec<Symbol>,
    pub evicted: Vec<Symbol>,
}

/// Координатор приложения: единственный владелец жизненного цикла дисплеев.
///
/// Ticks go straight to the shared store and may arrive from any thread that
/// holds [`LiveCanvasCoordinator::store`]; display lifecycle and rendering run
/// on the owner's thread.
pub struct LiveCanvasCoordinator<F: UpstreamFeed> {
    config: EngineConfig,
    clock: Arc<dyn TimeProvider>,
    store: Arc<SymbolStateStore>,
    registry: SubscriptionRegistry<F>,
    displays: EcsWorld,
    events: InMemoryEventDispatcher<ChartEvent>,
}

impl<F: UpstreamFeed> LiveCanvasCoordinator<F> {
    pub fn new(config: EngineConfig, feed: F, clock: Arc<dyn TimeProvider>) -> AppResult<Self> {
        config.validate()?;
        let store = Arc::new(SymbolStateStore::new(&config, Arc::clone(&clock))?);
        let registry = SubscriptionRegistry::new(Arc::clone(&store), feed, &config);

        get_logger().info(
            LogComponent::Application("LiveCanvasCoordinator"),
            &format!(
                "Coordinator ready: {} tiers, smoothing {}, scale [{}, {}], {} Hz",
                config.tier_thresholds.len(),
                config.smoothing_rate,
                config.min_scale,
                config.max_scale,
                config.max_render_hz
            ),
        );

        Ok(Self {
            config,
            clock,
            store,
            registry,
            displays: EcsWorld::new(),
            events: InMemoryEventDispatcher::new(),
        })
    }

    /// Источник сессионных базовых значений для новых символов
    pub fn with_seeds(self, seeds: Arc<dyn SessionSeedRepository>) -> Self {
        self.store.set_seeds(seeds);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SymbolStateStore> {
        &self.store
    }

    pub fn registry(&self) -> &SubscriptionRegistry<F> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SubscriptionRegistry<F> {
        &mut self.registry
    }

    pub fn now(&self) -> u64 {
        self.clock.current_timestamp()
    }

    pub fn on_chart_event<H>(&self, handler: H)
    where
        H: Fn(&ChartEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
    }

    pub fn on_market_event<H>(&self, handler: H)
    where
        H: Fn(&MarketDataEvent) + Send + Sync + 'static,
    {
        self.store.on_event(handler);
    }

    // ----- transport side -----

    /// Входящий тик от транспорта
    pub fn on_tick(&self, symbol: &str, price: f64, timestamp: u64) -> ApplyResult {
        self.store.apply(symbol, price, timestamp)
    }

    pub fn on_ticks(&self, ticks: &[Tick]) -> BatchSummary {
        self.store.apply_batch(ticks)
    }

    /// Граница сессии: новый daily open и прогноз диапазона
    pub fn reset_session(
        &self,
        symbol: &str,
        daily_open: f64,
        projected_range: f64,
    ) -> AppResult<Arc<SymbolState>> {
        let symbol = Symbol::new(symbol)?;
        Ok(self.store.reset(&symbol, daily_open, projected_range)?)
    }

    pub fn feed_disconnected(&self, symbol: &str) -> AppResult<bool> {
        let symbol = Symbol::new(symbol)?;
        Ok(self.registry.mark_feed_disconnected(&symbol))
    }

    pub fn feed_connected(&self, symbol: &str) -> AppResult<bool> {
        let symbol = Symbol::new(symbol)?;
        Ok(self.registry.mark_feed_connected(&symbol))
    }

    pub fn stats(&self) -> IngestStats {
        self.store.stats()
    }

    // ----- UI side -----

    /// Открыть дисплей и подписать его на символ
    pub fn open_display(
        &mut self,
        display_id: &str,
        symbol: &str,
        geometry: CanvasGeometry,
    ) -> AppResult<()> {
        let id = DisplayId::new(display_id);
        if self.displays.contains(&id) {
            return Err(CoordinationError::DuplicateDisplay(id).into());
        }
        let symbol = Symbol::new(symbol)?;

        let (handle, cell) = self.registry.subscribe(id.clone(), &symbol);
        let render = RenderCoordinator::new(id.clone(), cell, geometry, &self.config);
        self.displays.spawn_display(handle, render)?;

        log_debug!(
            LogComponent::Application("LiveCanvasCoordinator"),
            "Display {} opened on {} ({}x{})",
            id,
            symbol,
            geometry.width,
            geometry.height
        );
        self.events.publish(ChartEvent::DisplayOpened { display_id: id, symbol });
        Ok(())
    }

    pub fn resize_display(&mut self, display_id: &str, geometry: CanvasGeometry) -> AppResult<()> {
        let id = DisplayId::new(display_id);
        self.displays.render_mut(&id)?.resize(geometry);
        self.events.publish(ChartEvent::DisplayResized { display_id: id, geometry });
        Ok(())
    }

    /// Закрыть дисплей: рендер отменяется сразу, подписка снимается
    pub fn close_display(&mut self, display_id: &str) -> AppResult<()> {
        let id = DisplayId::new(display_id);
        let (handle, mut render) = self.displays.despawn_display(&id)?;
        render.cancel();
        self.registry.unsubscribe(handle)?;
        log_debug!(LogComponent::Application("LiveCanvasCoordinator"), "Display {} closed", id);
        self.events.publish(ChartEvent::DisplayClosed { display_id: id });
        Ok(())
    }

    /// Переключить дисплей на другой символ.
    ///
    /// The new subscription is taken before the old one is released, so
    /// switching between two displays' symbols never bounces a shared feed.
    pub fn change_display_symbol(&mut self, display_id: &str, symbol: &str) -> AppResult<()> {
        let id = DisplayId::new(display_id);
        let symbol = Symbol::new(symbol)?;
        let previous = self.displays.render_mut(&id)?.symbol().clone();
        if previous == symbol {
            return Ok(());
        }

        let (handle, cell) = self.registry.subscribe(id.clone(), &symbol);
        self.displays.render_mut(&id)?.switch_symbol(cell);
        let old = self.displays.replace_subscription(&id, handle)?;
        self.registry.unsubscribe(old)?;

        self.events.publish(ChartEvent::DisplaySymbolChanged {
            display_id: id,
            from: previous,
            to: symbol,
        });
        Ok(())
    }

    pub fn display_count(&self) -> usize {
        self.displays.len()
    }

    pub fn display_ids(&self) -> Vec<DisplayId> {
        self.displays.display_ids()
    }

    pub fn display_symbol(&self, display_id: &str) -> Option<Symbol> {
        self.displays.symbol_of(&DisplayId::new(display_id))
    }

    // ----- scheduling -----

    /// Один проход рендера по всем дисплеям
    pub fn render<S: DrawingSink + ?Sized>(&mut self, now: u64, sink: &mut S) -> usize {
        systems::render_due_displays(&mut self.displays.world, now, sink)
    }

    /// Закрыть просроченные фиды и выселить простаивающие символы
    pub fn maintain(&mut self, now: u64) -> MaintenanceReport {
        let closed_feeds = self.registry.poll_expired(now);
        let registry = &self.registry;
        let keep = |symbol: &Symbol| registry.is_observed(symbol) || registry.is_feed_open(symbol);
        let evicted = self.store.evict_idle(now, keep);
        MaintenanceReport { closed_feeds, evicted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{AppError, ApplicationError};
    use crate::infrastructure::services::ManualTimeProvider;

    struct NullFeed;

    impl UpstreamFeed for NullFeed {
        fn open(&mut self, _symbol: &Symbol) {}
        fn close(&mut self, _symbol: &Symbol) {}
    }

    fn coordinator() -> LiveCanvasCoordinator<NullFeed> {
        let clock = Arc::new(ManualTimeProvider::new(0));
        LiveCanvasCoordinator::new(EngineConfig::default(), NullFeed, clock).unwrap()
    }

    #[test]
    fn duplicate_and_unknown_displays_are_errors() {
        let mut c = coordinator();
        c.open_display("main", "BTCUSDT", CanvasGeometry::default()).unwrap();
        let dup = c.open_display("main", "ETHUSDT", CanvasGeometry::default());
        assert!(matches!(
            dup,
            Err(AppError::Application(ApplicationError::Coordination(
                CoordinationError::DuplicateDisplay(_)
            )))
        ));
        assert!(c.close_display("nope").is_err());
        assert!(c.resize_display("nope", CanvasGeometry::default()).is_err());
        assert_eq!(c.display_count(), 1);
    }

    #[test]
    fn switching_symbol_moves_subscription() {
        let mut c = coordinator();
        c.open_display("main", "BTCUSDT", CanvasGeometry::default()).unwrap();
        c.change_display_symbol("main", "ethusdt").unwrap();
        assert_eq!(c.display_symbol("main"), Some(Symbol::from("ETHUSDT")));
        assert_eq!(c.registry().refcount(&Symbol::from("ETHUSDT")), 1);
        assert_eq!(c.registry().refcount(&Symbol::from("BTCUSDT")), 0);
    }

    #[test]
    fn invalid_seed_is_a_validation_error() {
        let c = coordinator();
        assert!(matches!(c.reset_session("BTCUSDT", -1.0, 10.0), Err(AppError::Domain(_))));
        assert!(matches!(c.reset_session("", 1.0, 10.0), Err(AppError::Domain(_))));
    }
}
