//! Canonical string keys used for restriction lookups.
//!
//! A key is `part <token> material <token> color`, with an absent component
//! encoded as the empty string. With the default `:` token a color-only key
//! for `black` is `::black` and a part-only key for `logo` is `logo::`.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN: &str = ":";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestrictionKey(String);

impl RestrictionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RestrictionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds restriction keys with a fixed separator token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEncoder {
    token: String,
}

impl Default for KeyEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN)
    }
}

impl KeyEncoder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn encode(
        &self,
        part: Option<&str>,
        material: Option<&str>,
        color: Option<&str>,
    ) -> RestrictionKey {
        let part = part.unwrap_or("");
        let material = material.unwrap_or("");
        let color = color.unwrap_or("");
        let mut key =
            String::with_capacity(part.len() + material.len() + color.len() + 2 * self.token.len());
        key.push_str(part);
        key.push_str(&self.token);
        key.push_str(material);
        key.push_str(&self.token);
        key.push_str(color);
        RestrictionKey(key)
    }

    pub fn part(&self, part: &str) -> RestrictionKey {
        self.encode(Some(part), None, None)
    }

    pub fn material(&self, material: Option<&str>) -> RestrictionKey {
        self.encode(None, material, None)
    }

    pub fn color(&self, color: Option<&str>) -> RestrictionKey {
        self.encode(None, None, color)
    }

    pub fn material_color(&self, material: Option<&str>, color: Option<&str>) -> RestrictionKey {
        self.encode(None, material, color)
    }
}
