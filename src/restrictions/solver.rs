//! Greedy restriction solver.
//!
//! The customization is treated as a stack: the last part (the one most
//! recently changed) is validated first and then kept. Every following part
//! is checked against the parts already accepted; a rejected part is
//! replaced by its next alternative and checked again. Accepted parts are
//! never revisited, so the search can miss a solution that a different
//! visiting order would have found.

use std::fmt;

use tracing::{debug, trace};

use super::alternative::{AlternativeFinder, WorkingCatalog};
use super::index::RestrictionsMap;
use super::key::{KeyEncoder, RestrictionKey};
use crate::config::{OptionalParts, PartOption};
use crate::parts::Part;

/// Result of a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Every part satisfies the restrictions. Dropped optional parts are
    /// present as empty parts.
    Solved(Vec<Part>),
    /// The named part was rejected and has no alternative left.
    Unsatisfiable(String),
    /// The named required part is not part of the customization.
    Incomplete(String),
}

impl SolveOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved(_))
    }

    /// The solution, or an empty list when the solve failed.
    pub fn into_parts(self) -> Vec<Part> {
        match self {
            SolveOutcome::Solved(parts) => parts,
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for SolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveOutcome::Solved(parts) => write!(f, "Solved({} parts)", parts.len()),
            SolveOutcome::Unsatisfiable(part) => write!(f, "Unsatisfiable({})", part),
            SolveOutcome::Incomplete(part) => write!(f, "Incomplete({})", part),
        }
    }
}

/// Counters collected during a solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStatistics {
    pub accepted: usize,
    pub rejected: usize,
    pub dropped: usize,
}

/// Restriction solver over one catalog and one compiled rule set.
pub struct RestrictionSolver<'a> {
    options: &'a [PartOption],
    optionals: &'a OptionalParts,
    restrictions: &'a RestrictionsMap,
    keys: &'a KeyEncoder,
}

impl<'a> RestrictionSolver<'a> {
    pub fn new(
        options: &'a [PartOption],
        optionals: &'a OptionalParts,
        restrictions: &'a RestrictionsMap,
        keys: &'a KeyEncoder,
    ) -> Self {
        Self {
            options,
            optionals,
            restrictions,
            keys,
        }
    }

    pub fn solve(&self, customization: Vec<Part>) -> SolveOutcome {
        self.solve_with_statistics(customization).0
    }

    pub fn solve_with_statistics(&self, customization: Vec<Part>) -> (SolveOutcome, SolverStatistics) {
        let mut stats = SolverStatistics::default();
        let mut catalog = WorkingCatalog::new(self.options.to_vec());
        let finder = AlternativeFinder::new(self.optionals);

        let mut pending = customization;
        let mut solution: Vec<Part> = Vec::with_capacity(pending.len());

        while let Some(candidate) = pending.pop() {
            if candidate.is_empty() {
                stats.dropped += 1;
                solution.push(candidate);
                continue;
            }

            if !self.is_restricted(&candidate, &solution) {
                trace!(
                    "Accepted {} ({:?}/{:?})",
                    candidate.name,
                    candidate.material,
                    candidate.color
                );
                stats.accepted += 1;
                solution.push(candidate);
                continue;
            }

            stats.rejected += 1;
            match finder.alternative_for(&candidate, &mut catalog, true) {
                Some(alternative) => pending.push(alternative),
                None => {
                    debug!(
                        "No alternative left for {} ({:?}/{:?})",
                        candidate.name, candidate.material, candidate.color
                    );
                    return (SolveOutcome::Unsatisfiable(candidate.name), stats);
                }
            }
        }

        if let Some(missing) = self.first_missing(&solution) {
            debug!("Required part {} missing from customization", missing);
            return (SolveOutcome::Incomplete(missing), stats);
        }

        debug!(
            "Solved {} parts ({} rejected, {} dropped)",
            solution.len(),
            stats.rejected,
            stats.dropped
        );
        (SolveOutcome::Solved(solution), stats)
    }

    /// Whether `candidate` is banned outright or conflicts with a placed part.
    pub fn is_restricted(&self, candidate: &Part, placed: &[Part]) -> bool {
        let name = candidate.name.as_str();
        let material = candidate.material.as_deref();
        let color = candidate.color.as_deref();

        let material_key = self.keys.material(material);
        let color_key = self.keys.color(color);
        let material_color_key = self.keys.material_color(material, color);

        let banned = [
            self.keys.part(name),
            material_key.clone(),
            color_key.clone(),
            material_color_key.clone(),
            self.keys.encode(Some(name), material, None),
            self.keys.encode(Some(name), None, color),
            self.keys.encode(Some(name), material, color),
        ];
        if banned.iter().any(|key| self.restrictions.is_banned(key)) {
            return true;
        }

        let conflicts: Vec<&RestrictionKey> = self
            .restrictions
            .conflicts(&material_color_key)
            .iter()
            .chain(self.restrictions.conflicts(&material_key))
            .chain(self.restrictions.conflicts(&color_key))
            .collect();
        if conflicts.is_empty() {
            return false;
        }

        placed
            .iter()
            .filter(|part| part.name != candidate.name && !part.is_empty())
            .any(|part| {
                let keys = self.placed_keys(part);
                conflicts.iter().any(|conflict| keys.contains(*conflict))
            })
    }

    fn placed_keys(&self, part: &Part) -> [RestrictionKey; 3] {
        let material = part.material.as_deref();
        let color = part.color.as_deref();
        [
            self.keys.material(material),
            self.keys.color(color),
            self.keys.material_color(material, color),
        ]
    }

    fn first_missing(&self, solution: &[Part]) -> Option<String> {
        self.options
            .iter()
            .filter(|option| !self.optionals.contains(&option.name))
            .find(|option| {
                !solution
                    .iter()
                    .any(|part| part.name == option.name && !part.is_empty())
            })
            .map(|option| option.name.clone())
    }
}
