//! Compilation of restriction rules into a keyed lookup structure.

use indexmap::IndexMap;
use tracing::debug;

use super::key::{KeyEncoder, RestrictionKey};
use crate::config::{RestrictionPattern, RestrictionRule};

/// What the map records for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    /// The key is forbidden in every customization.
    Banned,
    /// The key cannot coexist with any of these keys, in rule order.
    Conflicts(Vec<RestrictionKey>),
}

/// Read-only lookup built once per rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionsMap {
    entries: IndexMap<RestrictionKey, Restriction>,
}

impl RestrictionsMap {
    pub fn get(&self, key: &RestrictionKey) -> Option<&Restriction> {
        self.entries.get(key)
    }

    pub fn is_banned(&self, key: &RestrictionKey) -> bool {
        matches!(self.entries.get(key), Some(Restriction::Banned))
    }

    /// Keys conflicting with `key`; empty for banned or unknown keys.
    pub fn conflicts(&self, key: &RestrictionKey) -> &[RestrictionKey] {
        match self.entries.get(key) {
            Some(Restriction::Conflicts(keys)) => keys,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RestrictionKey, &Restriction)> {
        self.entries.iter()
    }
}

/// Builds a `RestrictionsMap` from restriction rules.
///
/// Rules and pattern pairs are visited in source order, so the conflict
/// lists (and therefore the alternatives the solver ends up choosing) are
/// stable for a given rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    keys: KeyEncoder,
}

impl RuleIndex {
    pub fn new(keys: KeyEncoder) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyEncoder {
        &self.keys
    }

    pub fn build(&self, rules: &[RestrictionRule]) -> RestrictionsMap {
        let mut entries: IndexMap<RestrictionKey, Restriction> = IndexMap::new();

        for rule in rules {
            match rule {
                RestrictionRule::Forbidden(pattern) => {
                    let key = self.keys.encode(
                        pattern.part.as_deref(),
                        pattern.material.as_deref(),
                        pattern.color.as_deref(),
                    );
                    entries.insert(key, Restriction::Banned);
                }
                RestrictionRule::Exclusive(patterns) => {
                    let keys: Vec<RestrictionKey> =
                        patterns.iter().map(|p| self.group_key(p)).collect();

                    for key in &keys {
                        for other in &keys {
                            if key == other {
                                continue;
                            }
                            let entry = entries
                                .entry(key.clone())
                                .or_insert_with(|| Restriction::Conflicts(Vec::new()));
                            if let Restriction::Conflicts(list) = entry {
                                list.push(other.clone());
                            }
                        }
                    }
                }
            }
        }

        debug!(
            "Built restrictions map with {} keys from {} rules",
            entries.len(),
            rules.len()
        );
        RestrictionsMap { entries }
    }

    // Group patterns are matched across parts, so the part component is dropped.
    fn group_key(&self, pattern: &RestrictionPattern) -> RestrictionKey {
        self.keys
            .material_color(pattern.material.as_deref(), pattern.color.as_deref())
    }
}
