//! Data models for part specifications and knowledge base entries
//!
//! This module provides:
//! - Part specification input (material plus holes to drill)
//! - Hole geometry (diameter, depth, XY position)
//! - Materials with recommended cutting parameters
//! - Tools with geometry and optional parameter overrides
//! - Operation definitions with their default tools

pub mod materials;
pub mod operations;
pub mod tools;

pub use materials::{Material, MaterialId};
pub use operations::{Operation, OperationId};
pub use tools::{Tool, ToolId, ToolKind};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hole to drill, in millimeters.
///
/// The position is fixed at exactly two coordinates by its type, so a
/// malformed position is rejected at parse time. Diameter and depth are not
/// checked here; non-positive values flow into the plan and are reported by
/// the plan validator against the offending step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoleSpec {
    /// Hole diameter (mm)
    #[serde(alias = "diameter_mm")]
    pub diameter: f64,
    /// Hole depth below the top surface (mm)
    #[serde(alias = "depth_mm")]
    pub depth: f64,
    /// Hole center as `[x, y]` (mm)
    pub position: [f64; 2],
}

impl HoleSpec {
    /// Create a new hole specification
    pub fn new(diameter: f64, depth: f64, x: f64, y: f64) -> Self {
        Self {
            diameter,
            depth,
            position: [x, y],
        }
    }

    /// X coordinate of the hole center
    pub fn x(&self) -> f64 {
        self.position[0]
    }

    /// Y coordinate of the hole center
    pub fn y(&self) -> f64 {
        self.position[1]
    }
}

impl fmt::Display for HoleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "D{:.3} x {:.3} @ X{:.3} Y{:.3}",
            self.diameter,
            self.depth,
            self.x(),
            self.y()
        )
    }
}

/// Caller-supplied description of the part to machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    /// Material identifier, resolved against the knowledge base
    pub material: MaterialId,
    /// Holes to drill, in machining order
    #[serde(default, alias = "drill_holes", deserialize_with = "holes_or_null")]
    pub holes: Vec<HoleSpec>,
}

impl PartSpec {
    /// Create a part spec with no holes
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: MaterialId::new(material),
            holes: Vec::new(),
        }
    }

    /// Builder method to add a hole
    pub fn with_hole(mut self, hole: HoleSpec) -> Self {
        self.holes.push(hole);
        self
    }

    /// Builder method to replace the hole list
    pub fn with_holes(mut self, holes: Vec<HoleSpec>) -> Self {
        self.holes = holes;
        self
    }

    /// Parse a part spec from JSON text
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

// `"holes": null` is accepted as an empty list.
fn holes_or_null<'de, D>(deserializer: D) -> Result<Vec<HoleSpec>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<HoleSpec>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_spec_parses_spec_field_names() {
        let spec = PartSpec::from_json_str(
            r#"{"material":"aluminum_6061","holes":[{"diameter":6.0,"depth":10.0,"position":[1.0,2.0]}]}"#,
        )
        .unwrap();
        assert_eq!(spec.material.as_str(), "aluminum_6061");
        assert_eq!(spec.holes, vec![HoleSpec::new(6.0, 10.0, 1.0, 2.0)]);
    }

    #[test]
    fn test_part_spec_parses_legacy_field_names() {
        let spec = PartSpec::from_json_str(
            r#"{"material":"steel_1018","drill_holes":[{"diameter_mm":3,"depth_mm":5,"position":[10,10]}]}"#,
        )
        .unwrap();
        assert_eq!(spec.holes.len(), 1);
        assert_eq!(spec.holes[0].diameter, 3.0);
        assert_eq!(spec.holes[0].y(), 10.0);
    }

    #[test]
    fn test_null_or_missing_holes_mean_empty() {
        let spec = PartSpec::from_json_str(r#"{"material":"aluminum_6061","holes":null}"#).unwrap();
        assert!(spec.holes.is_empty());
        let spec = PartSpec::from_json_str(r#"{"material":"aluminum_6061"}"#).unwrap();
        assert!(spec.holes.is_empty());
    }

    #[test]
    fn test_position_must_have_two_coordinates() {
        let err = PartSpec::from_json_str(
            r#"{"material":"aluminum_6061","holes":[{"diameter":6,"depth":10,"position":[1,2,3]}]}"#,
        );
        assert!(err.is_err());
        let err = PartSpec::from_json_str(
            r#"{"material":"aluminum_6061","holes":[{"diameter":6,"depth":10,"position":[1]}]}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_non_positive_geometry_is_accepted_at_parse_time() {
        let spec = PartSpec::from_json_str(
            r#"{"material":"aluminum_6061","holes":[{"diameter":0,"depth":-1,"position":[0,0]}]}"#,
        )
        .unwrap();
        assert_eq!(spec.holes[0].depth, -1.0);
    }

    #[test]
    fn test_hole_display() {
        let hole = HoleSpec::new(6.0, 10.0, 0.0, 12.5);
        assert_eq!(hole.to_string(), "D6.000 x 10.000 @ X0.000 Y12.500");
    }
}
