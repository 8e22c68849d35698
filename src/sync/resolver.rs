//! Propagation of sync groups over the assignment map.

use tracing::{debug, trace};

use crate::config::{SyncEntry, SyncRules};
use crate::parts::{Part, PartValue, PartsMap};

/// Forces the members of each sync group to follow a reference member.
///
/// The reference of a group is the part that just changed when the group
/// names it, and the group's first entry otherwise. Writes are
/// unconditional: there is no alternative search, which is why sync runs
/// after restriction solving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResolver {
    rules: SyncRules,
}

impl SyncResolver {
    pub fn new(rules: SyncRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &SyncRules {
        &self.rules
    }

    /// Applies every group in order and returns the names of the parts that
    /// were written.
    pub fn apply(&self, parts: &mut PartsMap, changed: Option<&Part>) -> Vec<String> {
        let mut written = Vec::new();

        for (name, group) in &self.rules {
            let Some(first) = group.first() else {
                continue;
            };

            let reference = changed
                .map(|part| part.name.as_str())
                .filter(|changed| group.iter().any(|entry| entry.part == *changed))
                .unwrap_or(first.part.as_str());

            let value = match changed {
                Some(part) if part.name == reference => part.value(),
                _ => parts.get(reference).cloned().unwrap_or_default(),
            };

            if value.is_empty() {
                trace!("Sync rule {} skipped: {} has no value", name, reference);
                continue;
            }

            if !should_sync(group, reference, &value) {
                trace!("Sync rule {} not triggered by {}", name, reference);
                continue;
            }

            for entry in group.iter().filter(|entry| entry.part != reference) {
                let target = synced_value(entry, &value);
                if parts.get(&entry.part) != Some(&target) {
                    written.push(entry.part.clone());
                }
                parts.insert(entry.part.clone(), target);
            }

            debug!("Sync rule {} applied from {}", name, reference);
        }

        written
    }
}

/// Whether an entry for `reference` has its pinned values satisfied.
fn should_sync(group: &[SyncEntry], reference: &str, value: &PartValue) -> bool {
    group
        .iter()
        .any(|entry| entry.part == reference && entry.accepts(value))
}

fn synced_value(entry: &SyncEntry, reference: &PartValue) -> PartValue {
    PartValue::from_options(
        entry.material.clone().or_else(|| reference.material.clone()),
        entry.color.clone().or_else(|| reference.color.clone()),
    )
}
