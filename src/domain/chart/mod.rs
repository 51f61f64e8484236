//! Chart aggregate: display identity, geometry and the price to pixel mapper.

pub mod services;
pub mod value_objects;

pub use services::*;
pub use value_objects::*;
