//! Restriction rules: key encoding, rule compilation, alternative search and
//! the greedy solver that keeps a customization free of conflicts.

mod alternative;
mod index;
mod key;
mod solver;

pub use alternative::{AlternativeFinder, WorkingCatalog};
pub use index::{Restriction, RestrictionsMap, RuleIndex};
pub use key::{KeyEncoder, RestrictionKey, DEFAULT_TOKEN};
pub use solver::{RestrictionSolver, SolveOutcome, SolverStatistics};
