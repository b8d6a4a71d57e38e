//! Pseudo G-code emission
//!
//! Renders a validated plan into illustrative, non machine-ready G-code. The
//! output is deterministic: the same plan and knowledge base always render the
//! same text.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use processkit_core::{
    DrillingStep, FaceMillingStep, KnowledgeBase, Material, OperationId, Plan, PlanStep, Tool,
    ToolId,
};

use crate::planner::{cutting_parameters, resolve_drill};

/// First line of every emitted program
pub const HEADER_MARKER: &str = "; PSEUDO-GCODE GENERATED";
/// Last line of every emitted program
pub const FOOTER_MARKER: &str = "M30";

/// Spindle speed used when the plan's material is missing from the knowledge base
pub const DEFAULT_RPM: u32 = 1000;
/// Feed rate used when the plan's material is missing from the knowledge base
pub const DEFAULT_FEED_RATE: f64 = 100.0;

/// Geometry settings of the emitter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmitterOptions {
    /// Clearance height for rapid moves (mm)
    pub safe_z: f64,
    /// Width of the faced area along X (mm)
    pub face_width: f64,
    /// Length of the faced area along Y (mm)
    pub face_length: f64,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            safe_z: 5.0,
            face_width: 50.0,
            face_length: 50.0,
        }
    }
}

/// Parameter that fell back to a default during emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackParameter {
    /// Cutting tool
    Tool,
    /// Spindle speed
    Rpm,
    /// Feed rate
    FeedRate,
    /// Hole position; only reachable on a plan that skipped validation
    Position,
    /// Hole depth; only reachable on a plan that skipped validation
    Depth,
}

impl fmt::Display for FallbackParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Rpm => write!(f, "rpm"),
            Self::FeedRate => write!(f, "feed rate"),
            Self::Position => write!(f, "position"),
            Self::Depth => write!(f, "depth"),
        }
    }
}

/// A default substituted for a missing step parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterFallback {
    /// Index of the step
    pub step: usize,
    /// Parameter that was missing
    pub parameter: FallbackParameter,
    /// Value used instead
    pub value: String,
}

impl fmt::Display for ParameterFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Step {}: {} not set, using {}",
            self.step, self.parameter, self.value
        )
    }
}

/// Emitted program with the fallbacks applied while rendering it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Program text, one command per line
    pub text: String,
    /// Defaults substituted for missing step parameters
    pub fallbacks: Vec<ParameterFallback>,
}

/// Resolved parameters of one block
struct BlockParameters<'a> {
    tool: Option<(&'a ToolId, Option<&'a Tool>)>,
    rpm: u32,
    feed_rate: f64,
}

/// Template renderer from plan to pseudo G-code
#[derive(Debug, Clone, Default)]
pub struct CodeEmitter {
    options: EmitterOptions,
}

impl CodeEmitter {
    /// Create an emitter with the given options
    pub fn new(options: EmitterOptions) -> Self {
        Self { options }
    }

    /// Emitter options in use
    pub fn options(&self) -> &EmitterOptions {
        &self.options
    }

    /// Render a plan that passed plan validation
    ///
    /// Never fails. Missing tool, rpm or feed rate values are replaced by
    /// knowledge base defaults; each substitution is logged and returned in
    /// [`Program::fallbacks`]. Missing drilling geometry renders at the origin
    /// with zero depth and is recorded the same way.
    pub fn emit(&self, plan: &Plan, kb: &KnowledgeBase) -> Program {
        let mut fallbacks = Vec::new();
        let material = kb.material(plan.material.as_str());
        if material.is_none() {
            warn!(material = %plan.material, "Material not in knowledge base, using built-in defaults");
        }

        let mut gcode = String::new();
        gcode.push_str(HEADER_MARKER);
        gcode.push('\n');
        gcode.push_str(&format!("; MATERIAL: {}\n", plan.material));
        gcode.push_str("G90 G21\n");

        for (index, step) in plan.steps.iter().enumerate() {
            match step {
                PlanStep::FaceMilling(face) => {
                    let params = self.face_parameters(index, face, kb, material, &mut fallbacks);
                    self.face_milling_block(&mut gcode, face, &params);
                }
                PlanStep::Drilling(drilling) => {
                    let params =
                        self.drilling_parameters(index, drilling, kb, material, &mut fallbacks);
                    self.drilling_block(&mut gcode, index, drilling, &params, &mut fallbacks);
                }
                PlanStep::Unsupported { tag } => {
                    gcode.push_str(&format!("; Unsupported operation: {}\n", tag));
                }
            }
        }

        gcode.push_str("M05\n");
        gcode.push_str(FOOTER_MARKER);
        gcode.push('\n');

        Program {
            text: gcode,
            fallbacks,
        }
    }

    fn face_parameters<'a>(
        &self,
        index: usize,
        face: &'a FaceMillingStep,
        kb: &'a KnowledgeBase,
        material: Option<&Material>,
        fallbacks: &mut Vec<ParameterFallback>,
    ) -> BlockParameters<'a> {
        let tool = match &face.tool {
            Some(id) => Some((id, kb.tool(id.as_str()))),
            None => {
                let default = kb.default_tool(OperationId::FACE_MILLING);
                if let Some((id, _)) = default {
                    record(fallbacks, index, FallbackParameter::Tool, id.to_string());
                }
                default.map(|(id, tool)| (id, Some(tool)))
            }
        };
        self.block_parameters(index, tool, face.rpm, face.feed_rate, material, fallbacks)
    }

    fn drilling_parameters<'a>(
        &self,
        index: usize,
        drilling: &'a DrillingStep,
        kb: &'a KnowledgeBase,
        material: Option<&Material>,
        fallbacks: &mut Vec<ParameterFallback>,
    ) -> BlockParameters<'a> {
        let tool = match &drilling.tool {
            Some(id) => Some((id, kb.tool(id.as_str()))),
            None => {
                let resolved = drilling
                    .diameter
                    .and_then(|diameter| resolve_drill(kb, diameter));
                if let Some((id, _)) = resolved {
                    record(fallbacks, index, FallbackParameter::Tool, id.to_string());
                }
                resolved.map(|(id, tool)| (id, Some(tool)))
            }
        };
        self.block_parameters(
            index,
            tool,
            drilling.rpm,
            drilling.feed_rate,
            material,
            fallbacks,
        )
    }

    fn block_parameters<'a>(
        &self,
        index: usize,
        tool: Option<(&'a ToolId, Option<&'a Tool>)>,
        rpm: Option<u32>,
        feed_rate: Option<f64>,
        material: Option<&Material>,
        fallbacks: &mut Vec<ParameterFallback>,
    ) -> BlockParameters<'a> {
        let (default_rpm, default_feed) = match material {
            Some(material) => cutting_parameters(tool.and_then(|(_, tool)| tool), material),
            None => (DEFAULT_RPM, DEFAULT_FEED_RATE),
        };
        let rpm = rpm.unwrap_or_else(|| {
            record(fallbacks, index, FallbackParameter::Rpm, default_rpm.to_string());
            default_rpm
        });
        let feed_rate = feed_rate.unwrap_or_else(|| {
            record(
                fallbacks,
                index,
                FallbackParameter::FeedRate,
                format!("{:.1}", default_feed),
            );
            default_feed
        });
        BlockParameters {
            tool,
            rpm,
            feed_rate,
        }
    }

    fn tool_comment(&self, gcode: &mut String, params: &BlockParameters<'_>) {
        match params.tool {
            Some((id, Some(tool))) => {
                gcode.push_str(&format!("; TOOL {} DIA {:.3}mm\n", id, tool.diameter))
            }
            Some((id, None)) => gcode.push_str(&format!("; TOOL {}\n", id)),
            None => gcode.push_str("; TOOL unspecified\n"),
        }
    }

    fn face_milling_block(
        &self,
        gcode: &mut String,
        face: &FaceMillingStep,
        params: &BlockParameters<'_>,
    ) {
        let o = &self.options;
        gcode.push_str("; -- Face Milling --\n");
        self.tool_comment(gcode, params);
        gcode.push_str(&format!("M03 S{}\n", params.rpm));
        gcode.push_str(&format!("G00 X0.000 Y0.000 Z{:.3}\n", o.safe_z));
        gcode.push_str(&format!(
            "G01 Z-{:.3} F{:.1}\n",
            face.depth, params.feed_rate
        ));
        gcode.push_str(&format!("G01 X{:.3} Y0.000\n", o.face_width));
        gcode.push_str(&format!(
            "G01 X{:.3} Y{:.3}\n",
            o.face_width, o.face_length
        ));
        gcode.push_str(&format!("G01 X0.000 Y{:.3}\n", o.face_length));
        gcode.push_str("G01 X0.000 Y0.000\n");
        gcode.push_str(&format!("G00 Z{:.3}\n", o.safe_z));
    }

    fn drilling_block(
        &self,
        gcode: &mut String,
        index: usize,
        drilling: &DrillingStep,
        params: &BlockParameters<'_>,
        fallbacks: &mut Vec<ParameterFallback>,
    ) {
        let o = &self.options;
        let [x, y] = drilling.position.unwrap_or_else(|| {
            record(fallbacks, index, FallbackParameter::Position, "[0.000, 0.000]".to_string());
            [0.0, 0.0]
        });
        let depth = drilling.depth.unwrap_or_else(|| {
            record(fallbacks, index, FallbackParameter::Depth, "0.000".to_string());
            0.0
        });
        gcode.push_str("; -- Drilling --\n");
        self.tool_comment(gcode, params);
        gcode.push_str(&format!("M03 S{}\n", params.rpm));
        gcode.push_str(&format!("G00 X{:.3} Y{:.3} Z{:.3}\n", x, y, o.safe_z));
        gcode.push_str(&format!("G01 Z-{:.3} F{:.1}\n", depth, params.feed_rate));
        gcode.push_str(&format!("G00 Z{:.3}\n", o.safe_z));
    }
}

fn record(
    fallbacks: &mut Vec<ParameterFallback>,
    step: usize,
    parameter: FallbackParameter,
    value: String,
) {
    warn!(step, parameter = %parameter, value = %value, "Parameter fallback applied");
    fallbacks.push(ParameterFallback {
        step,
        parameter,
        value,
    });
}
