pub mod config;
pub mod coordinator;
pub mod render_coordinator;
pub mod subscription_registry;
pub mod symbol_store;

pub use config::*;
pub use coordinator::*;
pub use render_coordinator::*;
pub use subscription_registry::*;
pub use symbol_store::*;
