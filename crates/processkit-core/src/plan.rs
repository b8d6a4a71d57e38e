//! Machining plan model
//!
//! A [`Plan`] is the ordered sequence of [`PlanStep`]s produced by a planner.
//! Steps are created once and never rewritten: validators and the code
//! emitter only read them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{MaterialId, ToolId};

/// Nominal depth of the face milling pass (mm)
pub const FACE_MILLING_DEPTH: f64 = 0.2;

/// Operation tags a plan step can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Facing the top surface
    FaceMilling,
    /// Drilling one hole
    Drilling,
}

impl OperationKind {
    /// Get all supported operation kinds
    pub fn all() -> &'static [OperationKind] {
        &[OperationKind::FaceMilling, OperationKind::Drilling]
    }

    /// Parse an operation tag (case-insensitive)
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "face_milling" | "facemilling" => Some(Self::FaceMilling),
            "drilling" => Some(Self::Drilling),
            _ => None,
        }
    }

    /// Tag as used in serialized plans and knowledge base operation keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FaceMilling => "face_milling",
            Self::Drilling => "drilling",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FaceMilling => write!(f, "Face Milling"),
            Self::Drilling => write!(f, "Drilling"),
        }
    }
}

/// Face milling pass over the top surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMillingStep {
    /// Depth of the pass (mm)
    pub depth: f64,
    /// Material being faced
    pub material: MaterialId,
    /// Resolved tool, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolId>,
    /// Resolved spindle speed (RPM), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<u32>,
    /// Resolved feed rate (mm/min), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_rate: Option<f64>,
    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FaceMillingStep {
    /// Create a face milling step at the nominal depth
    pub fn nominal(material: MaterialId) -> Self {
        Self {
            depth: FACE_MILLING_DEPTH,
            notes: Some(format!("Face top surface for {}", material)),
            material,
            tool: None,
            rpm: None,
            feed_rate: None,
        }
    }
}

/// Drilling of a single hole
///
/// Geometry fields are optional so that plans coming from an alternate
/// planner can represent missing values; the plan validator rejects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillingStep {
    /// Hole diameter (mm)
    pub diameter: Option<f64>,
    /// Hole depth (mm)
    pub depth: Option<f64>,
    /// Hole center `[x, y]` (mm)
    pub position: Option<[f64; 2]>,
    /// Resolved tool, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolId>,
    /// Resolved spindle speed (RPM), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<u32>,
    /// Resolved feed rate (mm/min), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_rate: Option<f64>,
}

impl DrillingStep {
    /// Create a drilling step from hole geometry, with no resolved parameters
    pub fn new(diameter: f64, depth: f64, position: [f64; 2]) -> Self {
        Self {
            diameter: Some(diameter),
            depth: Some(depth),
            position: Some(position),
            tool: None,
            rpm: None,
            feed_rate: None,
        }
    }

    /// Builder method to set the resolved tool and parameters
    pub fn with_parameters(mut self, tool: ToolId, rpm: u32, feed_rate: f64) -> Self {
        self.tool = Some(tool);
        self.rpm = Some(rpm);
        self.feed_rate = Some(feed_rate);
        self
    }
}

/// One machining operation with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum PlanStep {
    /// Face milling pass
    FaceMilling(FaceMillingStep),
    /// Drilling of one hole
    Drilling(DrillingStep),
    /// A step whose operation tag is not supported; kept so it can be reported
    Unsupported {
        /// The operation tag as received
        tag: String,
    },
}

impl PlanStep {
    /// Operation kind of this step, `None` for unsupported tags
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            Self::FaceMilling(_) => Some(OperationKind::FaceMilling),
            Self::Drilling(_) => Some(OperationKind::Drilling),
            Self::Unsupported { .. } => None,
        }
    }

    /// Depth of this step, if it carries one
    pub fn depth(&self) -> Option<f64> {
        match self {
            Self::FaceMilling(step) => Some(step.depth),
            Self::Drilling(step) => step.depth,
            Self::Unsupported { .. } => None,
        }
    }

    /// Tool of this step, if resolved
    pub fn tool(&self) -> Option<&ToolId> {
        match self {
            Self::FaceMilling(step) => step.tool.as_ref(),
            Self::Drilling(step) => step.tool.as_ref(),
            Self::Unsupported { .. } => None,
        }
    }
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FaceMilling(step) => {
                write!(f, "Face Milling depth {:.3} mm ({})", step.depth, step.material)
            }
            Self::Drilling(step) => {
                write!(f, "Drilling")?;
                if let Some(diameter) = step.diameter {
                    write!(f, " D{:.3}", diameter)?;
                }
                if let Some(depth) = step.depth {
                    write!(f, " depth {:.3} mm", depth)?;
                }
                if let Some([x, y]) = step.position {
                    write!(f, " at X{:.3} Y{:.3}", x, y)?;
                }
                if let Some(tool) = &step.tool {
                    write!(f, " with {}", tool)?;
                }
                Ok(())
            }
            Self::Unsupported { tag } => write!(f, "Unsupported operation '{}'", tag),
        }
    }
}

/// Ordered machining plan for one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Material the plan was made for
    pub material: MaterialId,
    /// Steps in machining order
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Create a plan from its steps
    pub fn new(material: MaterialId, steps: Vec<PlanStep>) -> Self {
        Self { material, steps }
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the drilling steps in plan order
    pub fn drilling_steps(&self) -> impl Iterator<Item = &DrillingStep> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::Drilling(drilling) => Some(drilling),
            _ => None,
        })
    }

    /// Render the plan as numbered lines
    pub fn pretty(&self) -> String {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| format!("{:>3}. {}", index + 1, step))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
