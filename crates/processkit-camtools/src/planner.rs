//! Rule-based plan generation
//!
//! Maps a part specification onto an ordered plan: one face milling pass
//! first, then one drilling step per hole in input order.

use async_trait::async_trait;
use tracing::{debug, info};

use processkit_core::{
    DrillingStep, FaceMillingStep, HoleSpec, KnowledgeBase, Material, OperationId, PartSpec, Plan,
    PlanStep, Tool, ToolId,
};

use crate::error::{AlternatePlanError, ProcessError, ProcessResult};

/// A planning strategy behind the `generate(spec, kb) -> Plan` contract
pub trait Planner: Send + Sync {
    /// Name recorded in the pipeline result
    fn name(&self) -> &str;

    /// Produce a plan for the part
    fn generate(&self, spec: &PartSpec, kb: &KnowledgeBase) -> ProcessResult<Plan>;
}

/// A planning strategy that may fail or stall, tried before the rule-based one
///
/// Plans from an alternate planner go through the same validation as rule-based
/// plans. Any failure makes the pipeline fall back to [`RuleBasedPlanner`].
#[async_trait]
pub trait AlternatePlanner: Send + Sync {
    /// Name recorded in the pipeline result
    fn name(&self) -> &str;

    /// Produce a plan for the part
    async fn generate(
        &self,
        spec: &PartSpec,
        kb: &KnowledgeBase,
    ) -> Result<Plan, AlternatePlanError>;
}

/// Spindle speed and feed rate for a tool cutting a material
///
/// Tool overrides take precedence over the material recommendations.
pub fn cutting_parameters(tool: Option<&Tool>, material: &Material) -> (u32, f64) {
    let rpm = tool
        .and_then(|tool| tool.recommended_rpm)
        .unwrap_or(material.recommended_rpm);
    let feed_rate = tool
        .and_then(|tool| tool.recommended_feed_rate)
        .unwrap_or(material.recommended_feed_rate);
    (rpm, feed_rate)
}

/// Resolve the drill for a hole diameter
///
/// An exact drill match wins; otherwise the drilling operation's default tool
/// is used.
pub fn resolve_drill(kb: &KnowledgeBase, diameter: f64) -> Option<(&ToolId, &Tool)> {
    kb.drill_for_diameter(diameter)
        .or_else(|| kb.default_tool(OperationId::DRILLING))
}

/// Look up the material of a part spec
pub fn resolve_material<'kb>(
    spec: &PartSpec,
    kb: &'kb KnowledgeBase,
) -> ProcessResult<&'kb Material> {
    kb.material(spec.material.as_str())
        .ok_or_else(|| ProcessError::UnknownMaterial {
            material: spec.material.to_string(),
        })
}

/// Absolute tolerance when comparing plan geometry with the part (mm)
const GEOMETRY_TOLERANCE: f64 = 1e-6;

fn close(value: Option<f64>, expected: f64) -> bool {
    value.is_some_and(|value| (value - expected).abs() <= GEOMETRY_TOLERANCE)
}

fn drills_hole(step: &DrillingStep, hole: &HoleSpec) -> bool {
    close(step.diameter, hole.diameter)
        && close(step.depth, hole.depth)
        && close(step.position.map(|[x, _]| x), hole.x())
        && close(step.position.map(|[_, y]| y), hole.y())
}

/// Check that a plan machines exactly the given part
///
/// Step 0 must face the part material; it is followed by one drilling step
/// per hole, in input order, with the hole's diameter, depth and position.
/// Plans from an alternate planner must pass this before they are used.
pub fn check_plan_shape(plan: &Plan, spec: &PartSpec) -> Result<(), AlternatePlanError> {
    let mismatch = |reason: String| Err(AlternatePlanError::ShapeMismatch { reason });

    if plan.material != spec.material {
        return mismatch(format!(
            "plan material '{}' differs from part material '{}'",
            plan.material, spec.material
        ));
    }

    match plan.steps.first() {
        Some(PlanStep::FaceMilling(_)) => {}
        Some(step) => return mismatch(format!("step 0 must be face milling, got {}", step)),
        None => return mismatch("plan has no steps".to_string()),
    }

    let rest = &plan.steps[1..];
    if rest.len() != spec.holes.len() {
        return mismatch(format!(
            "{} steps after face milling for {} holes",
            rest.len(),
            spec.holes.len()
        ));
    }

    for (index, (step, hole)) in rest.iter().zip(&spec.holes).enumerate() {
        match step {
            PlanStep::Drilling(drilling) if drills_hole(drilling, hole) => {}
            _ => {
                return mismatch(format!(
                    "step {} does not drill hole {} ({})",
                    index + 1,
                    index,
                    hole
                ))
            }
        }
    }

    Ok(())
}

/// Deterministic planner driven by the knowledge base
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedPlanner;

impl RuleBasedPlanner {
    /// Create a new rule-based planner
    pub fn new() -> Self {
        Self
    }

    fn face_milling_step(
        &self,
        spec: &PartSpec,
        kb: &KnowledgeBase,
        material: &Material,
    ) -> PlanStep {
        let mut step = FaceMillingStep::nominal(spec.material.clone());
        let tool = kb.default_tool(OperationId::FACE_MILLING);
        let (rpm, feed_rate) = cutting_parameters(tool.map(|(_, tool)| tool), material);
        step.tool = tool.map(|(id, _)| id.clone());
        step.rpm = Some(rpm);
        step.feed_rate = Some(feed_rate);
        PlanStep::FaceMilling(step)
    }
}

impl Planner for RuleBasedPlanner {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn generate(&self, spec: &PartSpec, kb: &KnowledgeBase) -> ProcessResult<Plan> {
        let material = resolve_material(spec, kb)?;

        let mut steps = Vec::with_capacity(spec.holes.len() + 1);
        steps.push(self.face_milling_step(spec, kb, material));

        for hole in &spec.holes {
            let index = steps.len();
            let step = DrillingStep::new(hole.diameter, hole.depth, hole.position);

            // Invalid geometry stays unresolved and is reported by the plan validator.
            if hole.diameter.is_nan() || hole.diameter <= 0.0 {
                debug!(step = index, diameter = hole.diameter, "Skipping tool resolution");
                steps.push(PlanStep::Drilling(step));
                continue;
            }

            let (tool_id, tool) =
                resolve_drill(kb, hole.diameter).ok_or(ProcessError::UnresolvedTool {
                    step: index,
                    diameter: hole.diameter,
                })?;
            let (rpm, feed_rate) = cutting_parameters(Some(tool), material);
            debug!(
                step = index,
                tool = %tool_id,
                rpm,
                feed_rate,
                "Resolved drilling parameters"
            );
            steps.push(PlanStep::Drilling(step.with_parameters(
                tool_id.clone(),
                rpm,
                feed_rate,
            )));
        }

        info!(
            material = %spec.material,
            steps = steps.len(),
            "Rule-based plan generated"
        );
        Ok(Plan::new(spec.material.clone(), steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use processkit_core::{HoleSpec, ToolKind};

    fn kb() -> KnowledgeBase {
        KnowledgeBase::bundled().unwrap()
    }

    #[test]
    fn test_tool_override_takes_precedence() {
        let material = Material::new(12000, 800.0);
        let tool = Tool::new(ToolKind::Drill, 10.0).with_overrides(Some(2500), None);
        assert_eq!(cutting_parameters(Some(&tool), &material), (2500, 800.0));
        assert_eq!(cutting_parameters(None, &material), (12000, 800.0));
    }

    #[test]
    fn test_face_milling_first_even_without_holes() {
        let plan = RuleBasedPlanner
            .generate(&PartSpec::new("steel_1018"), &kb())
            .unwrap();
        assert_eq!(plan.len(), 1);
        match &plan.steps[0] {
            PlanStep::FaceMilling(step) => {
                assert_eq!(step.depth, 0.2);
                assert_eq!(step.tool.as_ref().unwrap().as_str(), "endmill_6mm");
                assert_eq!(step.rpm, Some(3000));
            }
            other => panic!("expected face milling, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_drill_match_and_default_fallback() {
        let spec = PartSpec::new("aluminum_6061")
            .with_hole(HoleSpec::new(6.0, 10.0, 0.0, 0.0))
            .with_hole(HoleSpec::new(4.2, 8.0, 5.0, 5.0));
        let plan = RuleBasedPlanner.generate(&spec, &kb()).unwrap();
        let tools: Vec<&str> = plan
            .drilling_steps()
            .map(|step| step.tool.as_ref().unwrap().as_str())
            .collect();
        assert_eq!(tools, vec!["drill_6mm", "drill_3mm"]);
    }

    #[test]
    fn test_unknown_material() {
        let err = RuleBasedPlanner
            .generate(&PartSpec::new("unobtainium"), &kb())
            .unwrap_err();
        assert_eq!(
            err,
            ProcessError::UnknownMaterial {
                material: "unobtainium".to_string()
            }
        );
    }

    #[test]
    fn test_unresolved_tool_without_default() {
        let kb = KnowledgeBase::new()
            .with_material("aluminum_6061", Material::new(12000, 800.0))
            .with_tool("drill_3mm", Tool::new(ToolKind::Drill, 3.0));
        let spec = PartSpec::new("aluminum_6061").with_hole(HoleSpec::new(5.0, 5.0, 0.0, 0.0));
        let err = RuleBasedPlanner.generate(&spec, &kb).unwrap_err();
        assert_eq!(
            err,
            ProcessError::UnresolvedTool {
                step: 1,
                diameter: 5.0
            }
        );
    }

    #[test]
    fn test_rule_based_plan_has_part_shape() {
        let spec = PartSpec::new("aluminum_6061")
            .with_hole(HoleSpec::new(6.0, 10.0, 0.0, 0.0))
            .with_hole(HoleSpec::new(3.0, 5.0, 20.0, 20.0));
        let plan = RuleBasedPlanner.generate(&spec, &kb()).unwrap();
        assert!(check_plan_shape(&plan, &spec).is_ok());
    }

    #[test]
    fn test_shape_check_rejects_reordered_and_missing_holes() {
        let spec = PartSpec::new("aluminum_6061")
            .with_hole(HoleSpec::new(6.0, 10.0, 0.0, 0.0))
            .with_hole(HoleSpec::new(3.0, 5.0, 20.0, 20.0));
        let material = spec.material.clone();
        let face = || PlanStep::FaceMilling(FaceMillingStep::nominal(material.clone()));
        let drill = |hole: &HoleSpec| {
            PlanStep::Drilling(DrillingStep::new(hole.diameter, hole.depth, hole.position))
        };

        let face_last = Plan::new(
            material.clone(),
            vec![drill(&spec.holes[0]), drill(&spec.holes[1]), face()],
        );
        let missing = Plan::new(material.clone(), vec![face(), drill(&spec.holes[1])]);
        let swapped = Plan::new(
            material.clone(),
            vec![face(), drill(&spec.holes[1]), drill(&spec.holes[0])],
        );
        let moved = Plan::new(
            material.clone(),
            vec![
                face(),
                drill(&spec.holes[0]),
                drill(&HoleSpec::new(3.0, 5.0, 99.0, 99.0)),
            ],
        );

        for plan in [face_last, missing, swapped, moved] {
            assert!(matches!(
                check_plan_shape(&plan, &spec),
                Err(AlternatePlanError::ShapeMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_face_milling_without_default_tool_still_plans() {
        let kb = KnowledgeBase::new().with_material("aluminum_6061", Material::new(12000, 800.0));
        let plan = RuleBasedPlanner
            .generate(&PartSpec::new("aluminum_6061"), &kb)
            .unwrap();
        assert!(plan.steps[0].tool().is_none());
    }
}
