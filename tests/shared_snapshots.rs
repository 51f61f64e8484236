use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use live_price_canvas::application::{EngineConfig, LiveCanvasCoordinator, RenderFrame, SymbolStateStore};
use live_price_canvas::domain::chart::CanvasGeometry;
use live_price_canvas::domain::market_data::{Symbol, UpstreamFeed};
use live_price_canvas::infrastructure::services::ManualTimeProvider;

struct NoopFeed;

impl UpstreamFeed for NoopFeed {
    fn open(&mut self, _symbol: &Symbol) {}
    fn close(&mut self, _symbol: &Symbol) {}
}

#[test]
fn displays_on_one_symbol_see_the_same_snapshot() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let mut c = LiveCanvasCoordinator::new(EngineConfig::default(), NoopFeed, clock).unwrap();
    c.reset_session("XAUUSD", 2_000.0, 40.0).unwrap();
    c.open_display("left", "XAUUSD", CanvasGeometry::new(400.0, 300.0)).unwrap();
    c.open_display("right", "XAUUSD", CanvasGeometry::new(800.0, 600.0)).unwrap();
    c.on_tick("XAUUSD", 2_012.5, 10).unwrap();

    let mut frames: Vec<RenderFrame> = Vec::new();
    let drawn = c.render(0, &mut |frame: &RenderFrame| frames.push(frame.clone()));
    assert_eq!(drawn, 2);

    let (a, b) = (&frames[0], &frames[1]);
    assert_eq!(a.generation, b.generation);
    assert_eq!(a.current_price, 2_012.5);
    assert_eq!(a.current_price, b.current_price);
    assert_eq!((a.visual_low, a.visual_high), (b.visual_low, b.visual_high));
    // same price, same relative height on differently sized canvases
    assert!((a.current_y / a.height - b.current_y / b.height).abs() < 1e-12);

    let store = c.store();
    let first = store.get(&Symbol::from("XAUUSD")).unwrap();
    let second = store.get(&Symbol::from("XAUUSD")).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn concurrent_resets_are_never_lost() {
    const WRITERS: u64 = 4;
    const TICKS: u64 = 2_000;
    const RESETS: u64 = 25;

    let clock = Arc::new(ManualTimeProvider::new(0));
    let store = Arc::new(SymbolStateStore::new(&EngineConfig::default(), clock).unwrap());
    let symbol = Symbol::from("EURUSD");
    store.reset(&symbol, 1.05, 0.01).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let store = &store;
        let symbol = &symbol;
        let done = &done;

        let writers: Vec<_> = (0..WRITERS)
            .map(|writer| {
                scope.spawn(move || {
                    for i in 0..TICKS {
                        let price = 1.05 + ((i % 17) as f64 - 8.0) / 10_000.0;
                        let _ = store.apply("EURUSD", price, i * WRITERS + writer + 1);
                    }
                })
            })
            .collect();
        let resetter = scope.spawn(move || {
            for r in 0..RESETS {
                store.reset(symbol, 1.05 + r as f64 / 1_000.0, 0.01).unwrap();
                thread::yield_now();
            }
        });
        let reader = scope.spawn(move || {
            while !done.load(Ordering::Acquire) {
                if let Some(state) = store.get(symbol) {
                    assert!(state.session_low <= state.current_price);
                    assert!(state.current_price <= state.session_high);
                    assert!(state.visual_scale_factor >= 0.3 && state.visual_scale_factor <= 1.5);
                }
                thread::yield_now();
            }
        });

        for handle in writers {
            handle.join().unwrap();
        }
        resetter.join().unwrap();
        done.store(true, Ordering::Release);
        reader.join().unwrap();
    });

    let stats = store.stats();
    let state = store.get(&symbol).unwrap();
    assert_eq!(stats.resets, RESETS + 1);
    assert_eq!(state.session, RESETS + 1);
    assert_eq!(stats.accepted + stats.out_of_order + stats.duplicates, WRITERS * TICKS);
    assert_eq!(state.generation, stats.accepted + stats.resets);
}
