//! JavaScript surface (wasm32 only).

pub mod wasm_api;

pub use wasm_api::*;
