//! Live price canvases: per-symbol tick state, smoothed auto-scaling and
//! price to pixel mapping shared by any number of displays.

pub mod application;
pub mod domain;
pub mod ecs;
pub mod infrastructure;
#[cfg(target_arch = "wasm32")]
pub mod presentation;
pub mod time_utils;

pub use application::{EngineConfig, LiveCanvasCoordinator, RenderFrame};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Panic hook only; the logger is installed by `initEngine` at the configured level
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();
}
