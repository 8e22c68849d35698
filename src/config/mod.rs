//! Per-product catalog and rule sets.
//!
//! A `ProductConfig` is supplied once per product model and replaced
//! wholesale when the model changes. It carries the catalog of legal
//! material/color pairs, the default assignment (including which parts are
//! optional), the restriction rules and the sync groups.

mod loader;
mod types;

pub use loader::load_config;
pub use types::*;
