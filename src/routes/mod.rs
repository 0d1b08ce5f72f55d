//! Router assembly.

mod common;
mod models;

pub use common::{common_routes, common_routes_with_ready};
pub use models::{admin_router, model_routes};
