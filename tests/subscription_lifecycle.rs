use std::sync::Arc;

use futures::StreamExt;
use futures::executor::block_on;
use live_price_canvas::application::{EngineConfig, LiveCanvasCoordinator};
use live_price_canvas::domain::chart::CanvasGeometry;
use live_price_canvas::domain::market_data::{Symbol, UpstreamFeed};
use live_price_canvas::infrastructure::feed::{ChannelFeed, FeedCommand};
use live_price_canvas::infrastructure::services::ManualTimeProvider;

#[derive(Debug, Default)]
struct RecordingFeed {
    opened: Vec<Symbol>,
    closed: Vec<Symbol>,
}

impl RecordingFeed {
    fn open_now(&self) -> usize {
        self.opened.len() - self.closed.len()
    }
}

impl UpstreamFeed for RecordingFeed {
    fn open(&mut self, symbol: &Symbol) {
        self.opened.push(symbol.clone());
    }

    fn close(&mut self, symbol: &Symbol) {
        self.closed.push(symbol.clone());
    }
}

fn coordinator(
    config: EngineConfig,
) -> (LiveCanvasCoordinator<RecordingFeed>, Arc<ManualTimeProvider>) {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let c = LiveCanvasCoordinator::new(config, RecordingFeed::default(), clock.clone()).unwrap();
    (c, clock)
}

#[test]
fn one_feed_per_watched_symbol() {
    let (mut c, _) = coordinator(EngineConfig::default());
    c.open_display("a", "BTCUSDT", CanvasGeometry::default()).unwrap();
    c.open_display("b", "btcusdt", CanvasGeometry::default()).unwrap();
    c.open_display("c", "ETHUSDT", CanvasGeometry::default()).unwrap();

    let btc = Symbol::from("BTCUSDT");
    assert_eq!(c.registry().refcount(&btc), 2);
    assert_eq!(c.registry().feed().opened, vec![btc.clone(), Symbol::from("ETHUSDT")]);
    assert_eq!(c.registry().active_symbols(), vec![btc, Symbol::from("ETHUSDT")]);
}

#[test]
fn last_close_releases_feed_after_grace() {
    let (mut c, clock) = coordinator(EngineConfig::default());
    let btc = Symbol::from("BTCUSDT");
    c.open_display("a", "BTCUSDT", CanvasGeometry::default()).unwrap();
    c.open_display("b", "BTCUSDT", CanvasGeometry::default()).unwrap();

    c.close_display("a").unwrap();
    assert!(c.registry().is_observed(&btc));
    c.close_display("b").unwrap();
    assert!(!c.registry().is_observed(&btc));
    assert!(c.registry().is_feed_open(&btc));

    clock.set(1_999);
    assert!(c.maintain(1_999).closed_feeds.is_empty());
    clock.set(2_000);
    assert_eq!(c.maintain(2_000).closed_feeds, vec![btc.clone()]);
    assert_eq!(c.registry().feed().closed, vec![btc.clone()]);
    assert_eq!(c.registry().feed().open_now(), 0);

    c.open_display("a", "BTCUSDT", CanvasGeometry::default()).unwrap();
    assert_eq!(c.registry().feed().opened.len(), 2);
    assert_eq!(c.registry().feed().open_now(), 1);
}

#[test]
fn resubscribe_inside_grace_keeps_the_feed() {
    let (mut c, clock) = coordinator(EngineConfig::default());
    let btc = Symbol::from("BTCUSDT");
    c.open_display("a", "BTCUSDT", CanvasGeometry::default()).unwrap();
    c.close_display("a").unwrap();

    clock.set(1_000);
    c.open_display("a", "BTCUSDT", CanvasGeometry::default()).unwrap();
    clock.set(10_000);
    assert!(c.maintain(10_000).closed_feeds.is_empty());

    assert_eq!(c.registry().feed().opened, vec![btc.clone()]);
    assert!(c.registry().feed().closed.is_empty());
    assert_eq!(c.registry().open_feed_count(), 1);
    assert_eq!(c.registry().refcount(&btc), 1);
}

#[test]
fn zero_grace_releases_on_close() {
    let config = EngineConfig { unsubscribe_grace_ms: 0, ..EngineConfig::default() };
    let (mut c, _) = coordinator(config);
    c.open_display("a", "SOLUSDT", CanvasGeometry::default()).unwrap();
    c.close_display("a").unwrap();
    assert_eq!(c.registry().feed().closed, vec![Symbol::from("SOLUSDT")]);
    assert_eq!(c.registry().open_feed_count(), 0);
}

#[test]
fn symbol_switch_between_shared_feeds_never_bounces() {
    let (mut c, _) = coordinator(EngineConfig::default());
    c.open_display("a", "BTCUSDT", CanvasGeometry::default()).unwrap();
    c.change_display_symbol("a", "ETHUSDT").unwrap();
    c.change_display_symbol("a", "BTCUSDT").unwrap();

    // BTC was still inside its grace window when the display came back
    assert_eq!(c.registry().feed().opened, vec![Symbol::from("BTCUSDT"), Symbol::from("ETHUSDT")]);
    assert!(c.registry().feed().closed.is_empty());
    assert_eq!(c.display_symbol("a"), Some(Symbol::from("BTCUSDT")));
}

#[test]
fn channel_feed_forwards_commands_in_order() {
    let (feed, commands) = ChannelFeed::new();
    let config = EngineConfig { unsubscribe_grace_ms: 0, ..EngineConfig::default() };
    let clock = Arc::new(ManualTimeProvider::new(0));
    let mut c = LiveCanvasCoordinator::new(config, feed, clock).unwrap();
    c.open_display("a", "BTCUSDT", CanvasGeometry::default()).unwrap();
    c.change_display_symbol("a", "ETHUSDT").unwrap();
    c.close_display("a").unwrap();
    drop(c);

    let received: Vec<FeedCommand> = block_on(commands.collect());
    assert_eq!(
        received,
        vec![
            FeedCommand::Open(Symbol::from("BTCUSDT")),
            FeedCommand::Open(Symbol::from("ETHUSDT")),
            FeedCommand::Close(Symbol::from("BTCUSDT")),
            FeedCommand::Close(Symbol::from("ETHUSDT")),
        ]
    );
}
