use std::cell::RefCell;
use std::fmt::Display;
use std::sync::Arc;

use futures::channel::mpsc::UnboundedReceiver;
use serde_json::json;
use wasm_bindgen::prelude::*;

use crate::application::config::EngineConfig;
use crate::application::coordinator::LiveCanvasCoordinator;
use crate::application::render_coordinator::RenderFrame;
use crate::domain::chart::CanvasGeometry;
use crate::domain::logging::{LogComponent, get_logger, init_logger, init_time_provider};
use crate::domain::market_data::{SessionSeed, Symbol};
use crate::infrastructure::feed::{ChannelFeed, FeedCommand};
use crate::infrastructure::repositories::InMemorySeedRepository;
use crate::infrastructure::services::{ConsoleLogger, SystemTimeProvider};

/// JS-facing engine: минимальная логика, только мост к application слою
struct Engine {
    coordinator: LiveCanvasCoordinator<ChannelFeed>,
    seeds: Arc<InMemorySeedRepository>,
    commands: Option<UnboundedReceiver<FeedCommand>>,
}

// Глобальный экземпляр (thread-local для WASM)
thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

fn with_engine<F, R>(f: F) -> Result<R, JsValue>
where
    F: FnOnce(&mut Engine) -> Result<R, JsValue>,
{
    ENGINE.with(|engine| {
        let mut engine = engine.try_borrow_mut().map_err(|_| {
            JsValue::from_str("Engine is busy: call it again after the current export returns")
        })?;
        match engine.as_mut() {
            Some(engine) => f(engine),
            None => Err(JsValue::from_str("Engine not initialized: call initEngine first")),
        }
    })
}

fn to_js(error: impl Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Инициализировать движок. `config_json` may omit any key.
#[wasm_bindgen(js_name = initEngine)]
pub fn init_engine(config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json {
        Some(json) => EngineConfig::from_json(&json).map_err(to_js)?,
        None => EngineConfig::default(),
    };
    init_logger(Box::new(ConsoleLogger::new(config.log_level)));
    init_time_provider(Box::new(SystemTimeProvider::new()));

    let seeds = Arc::new(InMemorySeedRepository::new());
    let (feed, commands) = ChannelFeed::new();
    let coordinator = LiveCanvasCoordinator::new(config, feed, Arc::new(SystemTimeProvider::new()))
        .map_err(to_js)?
        .with_seeds(seeds.clone());

    ENGINE.with(|engine| {
        *engine.borrow_mut() = Some(Engine { coordinator, seeds, commands: Some(commands) });
    });
    get_logger().info(LogComponent::Presentation("WASM"), "🚀 Live price canvas engine initialized");
    Ok(())
}

/// Входящий тик. Returns whether it was applied.
#[wasm_bindgen(js_name = onTick)]
pub fn on_tick(symbol: &str, price: f64, timestamp: f64) -> Result<bool, JsValue> {
    with_engine(|engine| Ok(engine.coordinator.on_tick(symbol, price, timestamp.max(0.0) as u64).is_ok()))
}

#[wasm_bindgen(js_name = resetSession)]
pub fn reset_session(symbol: &str, daily_open: f64, projected_range: f64) -> Result<(), JsValue> {
    with_engine(|engine| {
        engine.coordinator.reset_session(symbol, daily_open, projected_range).map(|_| ()).map_err(to_js)
    })
}

/// Seed used when the first display opens on a symbol with no session yet.
#[wasm_bindgen(js_name = setSessionSeed)]
pub fn set_session_seed(symbol: &str, daily_open: f64, projected_range: f64) -> Result<(), JsValue> {
    let symbol = Symbol::new(symbol).map_err(to_js)?;
    let seed = SessionSeed::new(daily_open, projected_range).map_err(to_js)?;
    with_engine(|engine| {
        engine.seeds.insert(symbol, seed);
        Ok(())
    })
}

#[wasm_bindgen(js_name = openDisplay)]
pub fn open_display(display_id: &str, symbol: &str, width: f64, height: f64) -> Result<(), JsValue> {
    with_engine(|engine| {
        engine.coordinator.open_display(display_id, symbol, CanvasGeometry::new(width, height)).map_err(to_js)
    })
}

#[wasm_bindgen(js_name = resizeDisplay)]
pub fn resize_display(display_id: &str, width: f64, height: f64) -> Result<(), JsValue> {
    with_engine(|engine| {
        engine.coordinator.resize_display(display_id, CanvasGeometry::new(width, height)).map_err(to_js)
    })
}

#[wasm_bindgen(js_name = closeDisplay)]
pub fn close_display(display_id: &str) -> Result<(), JsValue> {
    with_engine(|engine| engine.coordinator.close_display(display_id).map_err(to_js))
}

#[wasm_bindgen(js_name = changeDisplaySymbol)]
pub fn change_display_symbol(display_id: &str, symbol: &str) -> Result<(), JsValue> {
    with_engine(|engine| engine.coordinator.change_display_symbol(display_id, symbol).map_err(to_js))
}

#[wasm_bindgen(js_name = feedDisconnected)]
pub fn feed_disconnected(symbol: &str) -> Result<bool, JsValue> {
    with_engine(|engine| engine.coordinator.feed_disconnected(symbol).map_err(to_js))
}

#[wasm_bindgen(js_name = feedConnected)]
pub fn feed_connected(symbol: &str) -> Result<bool, JsValue> {
    with_engine(|engine| engine.coordinator.feed_connected(symbol).map_err(to_js))
}

/// Один проход рендера: `callback` receives each due frame as a plain object.
///
/// Frames are collected first and handed to JS after the engine is released,
/// so the callback may call back into any export.
#[wasm_bindgen(js_name = renderFrame)]
pub fn render_frame(callback: &js_sys::Function) -> Result<usize, JsValue> {
    let frames = with_engine(|engine| {
        let now = engine.coordinator.now();
        let mut frames: Vec<RenderFrame> = Vec::new();
        engine.coordinator.render(now, &mut |frame: &RenderFrame| frames.push(frame.clone()));
        Ok(frames)
    })?;
    for frame in &frames {
        let json = serde_json::to_string(frame).map_err(to_js)?;
        let object = js_sys::JSON::parse(&json)?;
        callback.call1(&JsValue::NULL, &object)?;
    }
    Ok(frames.len())
}

/// Draw due frames straight onto the `<canvas>` elements named by display id.
#[cfg(feature = "render")]
#[wasm_bindgen(js_name = renderToCanvas)]
pub fn render_to_canvas() -> Result<usize, JsValue> {
    use crate::infrastructure::rendering::CanvasRenderer;
    with_engine(|engine| {
        let now = engine.coordinator.now();
        Ok(engine.coordinator.render(now, &mut CanvasRenderer::new()))
    })
}

/// Grace-period feed closes and idle eviction. Returns a JSON report.
#[wasm_bindgen]
pub fn maintain() -> Result<String, JsValue> {
    with_engine(|engine| {
        let now = engine.coordinator.now();
        let report = engine.coordinator.maintain(now);
        serde_json::to_string(&report).map_err(to_js)
    })
}

#[wasm_bindgen(js_name = ingestStats)]
pub fn ingest_stats() -> Result<String, JsValue> {
    with_engine(|engine| serde_json::to_string(&engine.coordinator.stats()).map_err(to_js))
}

/// Pending open/close requests for a JS-managed transport, as JSON.
#[wasm_bindgen(js_name = drainFeedCommands)]
pub fn drain_feed_commands() -> Result<String, JsValue> {
    with_engine(|engine| {
        let Some(commands) = engine.commands.as_mut() else {
            return Err(JsValue::from_str("Feed commands are consumed by the Binance feed"));
        };
        let mut drained = Vec::new();
        while let Ok(Some(command)) = commands.try_next() {
            drained.push(match command {
                FeedCommand::Open(symbol) => json!({ "open": symbol.value() }),
                FeedCommand::Close(symbol) => json!({ "close": symbol.value() }),
            });
        }
        Ok(serde_json::Value::Array(drained).to_string())
    })
}

/// Подключить встроенный Binance trade feed вместо JS-транспорта
#[wasm_bindgen(js_name = startBinanceFeed)]
pub fn start_binance_feed(url: Option<String>) -> Result<(), JsValue> {
    use crate::infrastructure::websocket::{BINANCE_WS_URL, BinanceTradeClient};

    let commands = with_engine(|engine| {
        engine.commands.take().ok_or_else(|| JsValue::from_str("Binance feed already started"))
    })?;
    let client = BinanceTradeClient::new(url.unwrap_or_else(|| BINANCE_WS_URL.to_string()));

    wasm_bindgen_futures::spawn_local(client.run(
        commands,
        |tick| {
            let _ = with_engine(|engine| Ok(engine.coordinator.store().apply_tick(&tick).is_ok()));
        },
        |symbol, connected| {
            let _ = with_engine(|engine| {
                let symbol = symbol.value();
                let result = if connected {
                    engine.coordinator.feed_connected(symbol)
                } else {
                    engine.coordinator.feed_disconnected(symbol)
                };
                result.map_err(to_js)
            });
        },
    ));
    Ok(())
}
