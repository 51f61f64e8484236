//! Binance trade stream: DTOs everywhere, the socket client on wasm32 only.

#[cfg(target_arch = "wasm32")]
pub mod binance_client;
pub mod dto;

#[cfg(target_arch = "wasm32")]
pub use binance_client::*;
pub use dto::*;
