pub mod feed;
#[cfg(all(target_arch = "wasm32", feature = "render"))]
pub mod rendering;
pub mod repositories;
pub mod services;
pub mod websocket;
