//! Materials module
//!
//! Material entries of the knowledge base: recommended spindle speed and feed
//! rate used whenever a tool does not declare its own.

use serde::{Deserialize, Serialize};

/// Material identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub String);

impl MaterialId {
    /// Create a material identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for MaterialId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for MaterialId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Material definition with recommended cutting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Recommended spindle speed (RPM)
    #[serde(alias = "recommended_rpm")]
    pub recommended_rpm: u32,
    /// Recommended feed rate (mm/min)
    #[serde(alias = "recommended_feed_mm_per_min")]
    pub recommended_feed_rate: f64,
    /// Free-form machining notes
    #[serde(default)]
    pub notes: String,
}

impl Material {
    /// Create a material with the given recommendations
    pub fn new(recommended_rpm: u32, recommended_feed_rate: f64) -> Self {
        Self {
            recommended_rpm,
            recommended_feed_rate,
            notes: String::new(),
        }
    }

    /// Builder method to set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
