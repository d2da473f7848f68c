//! Flag value object

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Value returned to a caller when a flag (or an override / rule)
/// applies.
///
/// `metadata` is treated immutably by readers: accessors hand out
/// copies, never references into the map. Equality is structural.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlagValue {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, serde_json::Value>,
}

impl FlagValue {
    /// Create a value with the given enabled state and no variant.
    pub fn new(enabled: bool) -> Self {
        Self { enabled, variant: None, metadata: HashMap::new() }
    }

    /// Canonical "on" value.
    pub fn on() -> Self {
        Self::new(true)
    }

    /// Canonical "off" value.
    pub fn off() -> Self {
        Self::new(false)
    }

    /// Attach a variant name.
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Copy of the metadata map.
    pub fn metadata(&self) -> HashMap<String, serde_json::Value> {
        self.metadata.clone()
    }

    /// Copy of a single metadata entry.
    pub fn metadata_value(&self, key: &str) -> Option<serde_json::Value> {
        self.metadata.get(key).cloned()
    }
}
