//! HTTP handlers for the model admin API.

pub mod model;
pub use model::*;
