//! Sync rules: named groups of parts that must share material and color.

mod resolver;

pub use crate::config::{SyncEntry, SyncRules};
pub use resolver::SyncResolver;
