use std::sync::Arc;

use live_price_canvas::application::{EngineConfig, LiveCanvasCoordinator};
use live_price_canvas::domain::chart::CanvasGeometry;
use live_price_canvas::domain::market_data::{Symbol, UpstreamFeed};
use live_price_canvas::infrastructure::services::ManualTimeProvider;

struct NoopFeed;

impl UpstreamFeed for NoopFeed {
    fn open(&mut self, _symbol: &Symbol) {}
    fn close(&mut self, _symbol: &Symbol) {}
}

fn symbols(names: &[&str]) -> Vec<Symbol> {
    names.iter().map(|s| Symbol::from(*s)).collect()
}

#[test]
fn only_unobserved_idle_symbols_are_evicted() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let mut c = LiveCanvasCoordinator::new(EngineConfig::default(), NoopFeed, clock.clone()).unwrap();
    for symbol in ["BTCUSDT", "ETHUSDT", "SOLUSDT"] {
        c.reset_session(symbol, 100.0, 10.0).unwrap();
    }
    c.open_display("watching", "BTCUSDT", CanvasGeometry::default()).unwrap();
    c.open_display("leaving", "SOLUSDT", CanvasGeometry::default()).unwrap();
    c.close_display("leaving").unwrap();

    clock.set(59_999);
    let early = c.maintain(59_999);
    assert_eq!(early.closed_feeds, symbols(&["SOLUSDT"]));
    assert!(early.evicted.is_empty());

    clock.set(60_000);
    let report = c.maintain(60_000);
    assert!(report.closed_feeds.is_empty());
    assert_eq!(report.evicted, symbols(&["ETHUSDT", "SOLUSDT"]));
    assert_eq!(c.store().symbols(), symbols(&["BTCUSDT"]));
    assert_eq!(c.stats().evicted, 2);
}

#[test]
fn symbol_in_grace_window_is_kept() {
    let config = EngineConfig {
        idle_evict_after_ms: 1_000,
        unsubscribe_grace_ms: 5_000,
        ..EngineConfig::default()
    };
    let clock = Arc::new(ManualTimeProvider::new(0));
    let mut c = LiveCanvasCoordinator::new(config, NoopFeed, clock.clone()).unwrap();
    c.reset_session("SOLUSDT", 100.0, 10.0).unwrap();
    c.open_display("d", "SOLUSDT", CanvasGeometry::default()).unwrap();
    c.close_display("d").unwrap();

    clock.set(2_000);
    assert!(c.maintain(2_000).evicted.is_empty());
    assert!(c.store().contains(&Symbol::from("SOLUSDT")));

    clock.set(5_000);
    let report = c.maintain(5_000);
    assert_eq!(report.closed_feeds, symbols(&["SOLUSDT"]));
    assert_eq!(report.evicted, symbols(&["SOLUSDT"]));
}

#[test]
fn recent_activity_keeps_a_symbol() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let mut c = LiveCanvasCoordinator::new(EngineConfig::default(), NoopFeed, clock.clone()).unwrap();
    c.reset_session("ETHUSDT", 100.0, 10.0).unwrap();

    clock.set(50_000);
    c.on_tick("ETHUSDT", 101.0, 50_000).unwrap();
    clock.set(100_000);
    assert!(c.maintain(100_000).evicted.is_empty());

    clock.set(110_000);
    assert_eq!(c.maintain(110_000).evicted, symbols(&["ETHUSDT"]));
    assert!(c.on_tick("ETHUSDT", 101.0, 110_001).is_err());
}
