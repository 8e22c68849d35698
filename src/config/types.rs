//! Type definitions for a product's customization configuration.
//!
//! These types deserialize from both the TOML rule files and the JSON
//! payload served by the remote configuration endpoint.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::CustomizeError;
use crate::parts::{PartValue, PartsMap};

// =============================================================================
// CATALOG TYPES
// =============================================================================

/// Root configuration for one product model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Catalog of legal material/color pairs for each part
    #[serde(default)]
    pub parts: Vec<PartOption>,
    /// Initial assignment and optional flag per part
    #[serde(default)]
    pub defaults: IndexMap<String, PartDefault>,
    /// Mutual-exclusion restriction rules
    #[serde(default)]
    pub restrictions: Vec<RestrictionRule>,
    /// Named sync groups, in source order
    #[serde(default)]
    pub sync: SyncRules,
}

/// Catalog entry for one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOption {
    pub name: String,
    #[serde(default)]
    pub materials: Vec<MaterialOption>,
}

/// A material offered for a part, with its alternate colors in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialOption {
    pub name: String,
    #[serde(default)]
    pub colors: Vec<String>,
}

/// Default assignment for a part as served in the `defaults` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDefault {
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// The part may be entirely absent from a customization
    #[serde(default)]
    pub optional: bool,
}

/// Names of the parts that may be absent.
pub type OptionalParts = IndexSet<String>;

// =============================================================================
// RULE TYPES
// =============================================================================

/// One `{part?, material?, color?}` pattern inside a restriction rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RestrictionPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl RestrictionPattern {
    pub fn material(material: impl Into<String>) -> Self {
        Self {
            material: Some(material.into()),
            ..Self::default()
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    pub fn part(part: impl Into<String>) -> Self {
        Self {
            part: Some(part.into()),
            ..Self::default()
        }
    }
}

/// A restriction rule, serialized as a list of patterns.
///
/// A single pattern is unconditionally forbidden. Two or more patterns are
/// pairwise exclusive: no two parts may match two different patterns of the
/// same rule at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RestrictionPattern>", into = "Vec<RestrictionPattern>")]
pub enum RestrictionRule {
    Forbidden(RestrictionPattern),
    Exclusive(Vec<RestrictionPattern>),
}

impl TryFrom<Vec<RestrictionPattern>> for RestrictionRule {
    type Error = String;

    fn try_from(mut patterns: Vec<RestrictionPattern>) -> Result<Self, Self::Error> {
        match patterns.len() {
            0 => Err("restriction rule must contain at least one pattern".to_string()),
            1 => Ok(Self::Forbidden(patterns.remove(0))),
            _ => Ok(Self::Exclusive(patterns)),
        }
    }
}

impl From<RestrictionRule> for Vec<RestrictionPattern> {
    fn from(rule: RestrictionRule) -> Self {
        match rule {
            RestrictionRule::Forbidden(pattern) => vec![pattern],
            RestrictionRule::Exclusive(patterns) => patterns,
        }
    }
}

/// One member of a sync group. The string shorthand `"upper"` normalizes to
/// `{ part = "upper" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SyncEntryRepr")]
pub struct SyncEntry {
    pub part: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SyncEntry {
    pub fn part(part: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            material: None,
            color: None,
        }
    }

    pub fn pinned(part: impl Into<String>, material: Option<&str>, color: Option<&str>) -> Self {
        Self {
            part: part.into(),
            material: material.map(str::to_string),
            color: color.map(str::to_string),
        }
    }

    /// Whether the value satisfies this entry's pinned material and color.
    pub fn accepts(&self, value: &PartValue) -> bool {
        let material_ok = self
            .material
            .as_ref()
            .map_or(true, |m| value.material.as_ref() == Some(m));
        let color_ok = self
            .color
            .as_ref()
            .map_or(true, |c| value.color.as_ref() == Some(c));
        material_ok && color_ok
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SyncEntryRepr {
    Name(String),
    Entry {
        part: String,
        #[serde(default)]
        material: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
}

impl From<SyncEntryRepr> for SyncEntry {
    fn from(repr: SyncEntryRepr) -> Self {
        match repr {
            SyncEntryRepr::Name(part) => SyncEntry::part(part),
            SyncEntryRepr::Entry {
                part,
                material,
                color,
            } => SyncEntry {
                part,
                material,
                color,
            },
        }
    }
}

/// Sync groups keyed by rule name.
pub type SyncRules = IndexMap<String, Vec<SyncEntry>>;

// =============================================================================
// ENGINE OPTIONS
// =============================================================================

/// Runtime options for the change pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Separator used when encoding restriction keys
    pub token: String,
    /// Register the restriction stage
    pub restrictions: bool,
    /// Register the sync stage
    pub sync: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            token: ":".to_string(),
            restrictions: true,
            sync: true,
        }
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl ProductConfig {
    pub fn part_option(&self, name: &str) -> Option<&PartOption> {
        self.parts.iter().find(|option| option.name == name)
    }

    /// Whether the part appears in the catalog or in the defaults.
    pub fn knows_part(&self, name: &str) -> bool {
        self.defaults.contains_key(name) || self.part_option(name).is_some()
    }

    pub fn is_optional(&self, name: &str) -> bool {
        self.defaults.get(name).is_some_and(|d| d.optional)
    }

    pub fn optional_parts(&self) -> OptionalParts {
        self.defaults
            .iter()
            .filter(|(_, default)| default.optional)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The initial assignment map: every default that names both a
    /// material and a color.
    pub fn default_parts(&self) -> PartsMap {
        self.defaults
            .iter()
            .filter_map(|(name, default)| {
                let value =
                    PartValue::from_options(default.material.clone(), default.color.clone());
                (!value.is_empty()).then(|| (name.clone(), value))
            })
            .collect()
    }

    /// Structural checks. Rules naming unknown parts, materials or colors are
    /// accepted and simply never match.
    pub fn validate(&self) -> Result<(), CustomizeError> {
        let mut seen = IndexSet::new();
        for option in &self.parts {
            if !seen.insert(option.name.as_str()) {
                return Err(CustomizeError::InvalidConfig(format!(
                    "part '{}' is listed more than once in the catalog",
                    option.name
                )));
            }
        }

        for (name, entries) in &self.sync {
            if entries.is_empty() {
                return Err(CustomizeError::InvalidConfig(format!(
                    "sync rule '{}' has no entries",
                    name
                )));
            }
        }

        Ok(())
    }
}
