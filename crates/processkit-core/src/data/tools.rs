//! Tools module - tool definitions used by the planner
//!
//! This module provides:
//! - Tool kinds (drill, end mill, anything else the knowledge base declares)
//! - Tool geometry (cutting diameter, flutes) and tool material
//! - Optional per-tool spindle speed and feed rate overrides

use serde::{Deserialize, Serialize};

/// Absolute tolerance used when matching a tool diameter (mm)
pub const DIAMETER_TOLERANCE: f64 = 1e-6;

/// Tool kinds for classification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolKind {
    /// Twist drill
    Drill,
    /// End mill
    EndMill,
    /// Any kind the planner has no special rules for
    Other(String),
}

impl ToolKind {
    /// Identifier used in the persisted knowledge base
    pub fn as_str(&self) -> &str {
        match self {
            Self::Drill => "drill",
            Self::EndMill => "endmill",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for ToolKind {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "drill" => Self::Drill,
            "endmill" | "end_mill" => Self::EndMill,
            _ => Self::Other(value),
        }
    }
}

impl From<ToolKind> for String {
    fn from(kind: ToolKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drill => write!(f, "Drill"),
            Self::EndMill => write!(f, "End Mill"),
            Self::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Tool identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(
    /// The unique string identifier for the tool.
    pub String,
);

impl ToolId {
    /// Create a tool identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for ToolId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Complete tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Tool kind
    #[serde(alias = "type")]
    pub kind: ToolKind,
    /// Cutting diameter in mm
    #[serde(alias = "diameter_mm")]
    pub diameter: f64,
    /// Number of flutes
    #[serde(default = "default_flutes")]
    pub flutes: u32,
    /// Tool material (HSS, carbide, ...)
    #[serde(default)]
    pub material: String,
    /// Spindle speed override (RPM); takes precedence over the material
    #[serde(default, alias = "recommended_rpm", skip_serializing_if = "Option::is_none")]
    pub recommended_rpm: Option<u32>,
    /// Feed rate override (mm/min); takes precedence over the material
    #[serde(
        default,
        alias = "recommended_feed_mm_per_min",
        skip_serializing_if = "Option::is_none"
    )]
    pub recommended_feed_rate: Option<f64>,
}

fn default_flutes() -> u32 {
    2
}

impl Tool {
    /// Create a new tool with basic properties
    pub fn new(kind: ToolKind, diameter: f64) -> Self {
        Self {
            kind,
            diameter,
            flutes: default_flutes(),
            material: String::new(),
            recommended_rpm: None,
            recommended_feed_rate: None,
        }
    }

    /// Builder method to set cutting parameter overrides
    pub fn with_overrides(mut self, rpm: Option<u32>, feed_rate: Option<f64>) -> Self {
        self.recommended_rpm = rpm;
        self.recommended_feed_rate = feed_rate;
        self
    }

    /// Check if this is a drill whose diameter matches within tolerance
    pub fn is_drill_of(&self, diameter: f64) -> bool {
        self.kind == ToolKind::Drill && (self.diameter - diameter).abs() <= DIAMETER_TOLERANCE
    }

    /// Get a descriptive string for the tool
    pub fn description_short(&self) -> String {
        format!(
            "{} - {} dia, {} flutes, {}",
            self.kind, self.diameter, self.flutes, self.material
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_round_trips_through_strings() {
        assert_eq!(ToolKind::from("drill".to_string()), ToolKind::Drill);
        assert_eq!(ToolKind::from("EndMill".to_string()), ToolKind::EndMill);
        assert_eq!(
            ToolKind::from("reamer".to_string()),
            ToolKind::Other("reamer".to_string())
        );
        assert_eq!(String::from(ToolKind::EndMill), "endmill");
    }

    #[test]
    fn test_is_drill_of_uses_tolerance() {
        let drill = Tool::new(ToolKind::Drill, 6.0);
        assert!(drill.is_drill_of(6.0));
        assert!(drill.is_drill_of(6.0 + 1e-9));
        assert!(!drill.is_drill_of(6.1));

        let endmill = Tool::new(ToolKind::EndMill, 6.0);
        assert!(!endmill.is_drill_of(6.0));
    }

    #[test]
    fn test_tool_parses_legacy_keys() {
        let tool: Tool = serde_json::from_str(
            r#"{"type":"drill","diameter_mm":3.0,"flutes":2,"material":"HSS"}"#,
        )
        .unwrap();
        assert_eq!(tool.kind, ToolKind::Drill);
        assert_eq!(tool.diameter, 3.0);
        assert!(tool.recommended_rpm.is_none());
    }
}
