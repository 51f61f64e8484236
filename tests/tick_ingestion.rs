use std::sync::{Arc, Mutex};

use live_price_canvas::application::{EngineConfig, SymbolStateStore};
use live_price_canvas::domain::events::{DomainEvent, MarketDataEvent};
use live_price_canvas::domain::market_data::{SessionSeed, Symbol, Tick, TickRejection};
use live_price_canvas::infrastructure::repositories::InMemorySeedRepository;
use live_price_canvas::infrastructure::services::ManualTimeProvider;

fn store() -> SymbolStateStore {
    SymbolStateStore::new(&EngineConfig::default(), Arc::new(ManualTimeProvider::new(0))).unwrap()
}

#[test]
fn malformed_ticks_are_counted_not_fatal() {
    let store = store();
    store.reset(&Symbol::from("EURUSD"), 1.05, 0.01).unwrap();

    for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(store.apply("EURUSD", price, 1), Err(TickRejection::InvalidPrice { .. })));
    }
    assert!(matches!(store.apply("GBPUSD", 1.25, 1), Err(TickRejection::UnknownSymbol { .. })));
    assert!(store.apply("EURUSD", 1.051, 2).is_ok());

    let stats = store.stats();
    assert_eq!(stats.invalid_price, 4);
    assert_eq!(stats.unknown_symbol, 1);
    assert_eq!(stats.rejected(), 5);
    assert_eq!(stats.accepted, 1);
    assert_eq!(store.get(&Symbol::from("EURUSD")).unwrap().current_price.value(), 1.051);
}

#[test]
fn first_tick_creates_state_from_the_seed() {
    let store = store();
    let seeds = Arc::new(InMemorySeedRepository::new());
    seeds.insert(Symbol::from("EURUSD"), SessionSeed::new(1.05, 0.01).unwrap());
    store.set_seeds(seeds);

    let state = store.apply("EURUSD", 1.0502, 1).unwrap();
    assert_eq!(state.session, 1);
    assert_eq!(state.daily_open.value(), 1.05);
    assert_eq!(state.current_price.value(), 1.0502);
    assert_eq!(state.session_high.value(), 1.0502);
    assert_eq!(state.session_low.value(), 1.05);
    assert!(store.contains(&Symbol::from("EURUSD")));

    assert!(matches!(store.apply("GBPUSD", 1.25, 1), Err(TickRejection::UnknownSymbol { .. })));
    assert!(!store.contains(&Symbol::from("GBPUSD")));
    let stats = store.stats();
    assert_eq!((stats.accepted, stats.resets, stats.unknown_symbol), (1, 1, 1));
}

#[test]
fn reset_discards_extrema_and_keeps_counting() {
    let store = store();
    let symbol = Symbol::from("EURUSD");
    store.reset(&symbol, 1.05, 0.01).unwrap();
    store.apply("EURUSD", 1.058, 5_000).unwrap();
    store.apply("EURUSD", 1.044, 6_000).unwrap();

    let next = store.reset(&symbol, 1.046, 0.012).unwrap();
    assert_eq!(next.session, 2);
    assert_eq!(next.session_high, next.session_low);
    assert_eq!(next.current_price.value(), 1.046);
    assert_eq!(next.visual_scale_factor, 0.3);
    // ticks from before the boundary stay behind it
    assert!(store.apply("EURUSD", 1.05, 100).is_err());
    assert!(store.reset(&symbol, 1.046, 0.0).is_err());
    assert_eq!(store.get(&symbol).unwrap().session, 2);
}

#[test]
fn batch_keeps_per_symbol_order() {
    let store = store();
    store.reset(&Symbol::from("BTCUSDT"), 30_000.0, 900.0).unwrap();
    store.reset(&Symbol::from("ETHUSDT"), 2_000.0, 80.0).unwrap();

    let ticks: Vec<Tick> = (1..=200u64)
        .map(|i| {
            if i % 2 == 0 {
                Tick::new(Symbol::from("BTCUSDT"), 30_000.0 + i as f64, i)
            } else {
                Tick::new(Symbol::from("ETHUSDT"), 2_000.0 - i as f64 / 10.0, i)
            }
        })
        .chain(std::iter::once(Tick::new(Symbol::from("XRPUSDT"), 0.5, 1)))
        .collect();

    let summary = store.apply_batch(&ticks);
    assert_eq!(summary.accepted, 200);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.symbols, 3);

    let btc = store.get(&Symbol::from("BTCUSDT")).unwrap();
    assert_eq!(btc.current_price.value(), 30_200.0);
    assert_eq!(btc.generation, 101);
    let eth = store.get(&Symbol::from("ETHUSDT")).unwrap();
    assert_eq!(eth.current_price.value(), 2_000.0 - 199.0 / 10.0);
    assert_eq!(eth.session_high.value(), 2_000.0);
}

#[test]
fn listeners_see_every_outcome() {
    let store = store();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.on_event(move |event: &MarketDataEvent| sink.lock().unwrap().push(event.event_type()));

    let symbol = Symbol::from("EURUSD");
    store.reset(&symbol, 1.05, 0.01).unwrap();
    store.apply("EURUSD", 1.051, 1).unwrap();
    let _ = store.apply("EURUSD", -1.0, 2);
    store.set_feed_connected(&symbol, false);
    store.set_feed_connected(&symbol, false);

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["SessionReset", "SnapshotPublished", "TickRejected", "FeedStatusChanged"]
    );
}
