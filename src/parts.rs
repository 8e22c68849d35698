//! Part assignments and the diff between two assignment maps.
//!
//! A part is either fully assigned (material and color) or absent. Absence is
//! only legal for optional parts and is represented both by a missing map
//! entry and by a `PartValue` with neither field set.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The material/color pair assigned to a part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartValue {
    pub material: Option<String>,
    pub color: Option<String>,
}

impl PartValue {
    pub fn new(material: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            material: Some(material.into()),
            color: Some(color.into()),
        }
    }

    /// Builds a value from optional components. A value missing either
    /// component is a removal, so both are cleared.
    pub fn from_options(material: Option<String>, color: Option<String>) -> Self {
        match (material, color) {
            (Some(material), Some(color)) => Self {
                material: Some(material),
                color: Some(color),
            },
            _ => Self::default(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_none() || self.color.is_none()
    }
}

/// The shared part-assignment map, in insertion order.
pub type PartsMap = IndexMap<String, PartValue>;

/// A named part assignment, the unit the solvers work on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    pub name: String,
    pub material: Option<String>,
    pub color: Option<String>,
}

impl Part {
    pub fn new(
        name: impl Into<String>,
        material: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            material: Some(material.into()),
            color: Some(color.into()),
        }
    }

    /// A part with no material or color, meaning "drop this part".
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            material: None,
            color: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: &PartValue) -> Self {
        let value = PartValue::from_options(value.material.clone(), value.color.clone());
        Self {
            name: name.into(),
            material: value.material,
            color: value.color,
        }
    }

    pub fn value(&self) -> PartValue {
        PartValue::from_options(self.material.clone(), self.color.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_none() || self.color.is_none()
    }
}

/// One side of a change as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartState {
    pub part: String,
    pub material: Option<String>,
    pub color: Option<String>,
}

impl PartState {
    fn new(part: &str, value: &PartValue) -> Self {
        Self {
            part: part.to_string(),
            material: value.material.clone(),
            color: value.color.clone(),
        }
    }
}

/// A `{from, to}` pair for a part whose value differs between two maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartChange {
    pub from: PartState,
    pub to: PartState,
}

/// Writes a part into the map, removing the entry when the part is empty.
/// Existing entries keep their position.
pub fn apply_part(parts: &mut PartsMap, part: &Part) {
    if part.is_empty() {
        parts.shift_remove(&part.name);
    } else {
        parts.insert(part.name.clone(), part.value());
    }
}

/// Lists every part whose value differs between `before` and `after`.
///
/// Parts are reported in `before` order, followed by parts only present in
/// `after` in their own order. A missing entry and an empty value are the
/// same thing.
pub fn diff_parts(before: &PartsMap, after: &PartsMap) -> Vec<PartChange> {
    let empty = PartValue::empty();
    let mut changes = Vec::new();

    for (name, old) in before {
        let new = after.get(name).unwrap_or(&empty);
        if normalized(old) != normalized(new) {
            changes.push(PartChange {
                from: PartState::new(name, &normalized(old)),
                to: PartState::new(name, &normalized(new)),
            });
        }
    }

    for (name, new) in after {
        if before.contains_key(name) || new.is_empty() {
            continue;
        }
        changes.push(PartChange {
            from: PartState::new(name, &empty),
            to: PartState::new(name, &normalized(new)),
        });
    }

    changes
}

fn normalized(value: &PartValue) -> PartValue {
    PartValue::from_options(value.material.clone(), value.color.clone())
}
