//! Product configuration loading.
//!
//! Provides two input formats:
//! - TOML rule files, the format used for hand-maintained products
//! - JSON, the payload shape served by the remote configuration endpoint

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::types::ProductConfig;

impl ProductConfig {
    /// Parse and validate a TOML product configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ProductConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON product configuration.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: ProductConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Load a product configuration from a file.
///
/// Files ending in `.json` are parsed as JSON; everything else as TOML.
///
/// # Example
/// ```ignore
/// let config = load_config(Path::new("products/vyner.toml"))?;
/// ```
pub fn load_config(path: &Path) -> Result<ProductConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read product config {:?}", path))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config = if is_json {
        ProductConfig::from_json_str(&content)
    } else {
        ProductConfig::from_toml_str(&content)
    }
    .with_context(|| format!("Invalid product config {:?}", path))?;

    info!(
        "Loaded product config {:?}: {} parts, {} restrictions, {} sync rules",
        path,
        config.parts.len(),
        config.restrictions.len(),
        config.sync.len()
    );
    Ok(config)
}
