//! SQL generation and execution helpers: identifiers from registration only, values as parameters.

mod builder;
pub mod dialect;
pub mod params;
pub mod scan;

pub use builder::*;
pub use dialect::Dialect;
pub use params::*;
pub use scan::{scan_i64, scan_row};
