//! Pipeline orchestration
//!
//! Sequences planning, plan validation, code emission and program validation
//! into a single [`PipelineResult`]. Failures never escape: every run ends in
//! a well-formed result in either the `Done` or the `Failed` state.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use processkit_core::{KnowledgeBase, PartSpec, Plan, PlanStep};

use crate::code_emitter::{CodeEmitter, EmitterOptions, ParameterFallback};
use crate::error::{AlternatePlanError, ProcessError};
use crate::planner::{
    check_plan_shape, resolve_material, AlternatePlanner, Planner, RuleBasedPlanner,
};
use crate::validator::{validate_plan, validate_program, ValidationReport};

/// Pipeline state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Nothing has run yet
    Init,
    /// A planner has run
    Planned,
    /// The plan passed validation
    PreValidated,
    /// A program was emitted
    Coded,
    /// The program was checked
    PostValidated,
    /// Terminal state after emission
    Done,
    /// Terminal state when planning or plan validation failed
    Failed,
}

impl PipelineState {
    /// Check if a transition from this state to `target` is valid.
    ///
    /// - Planning failures move `Planned` to `Failed`
    /// - Plan rejection moves `PreValidated` to `Failed`
    /// - `PostValidated` always completes to `Done`, valid or not
    /// - `Done` and `Failed` are absorbing
    pub fn can_transition_to(&self, target: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, target),
            (Init, Planned)
                | (Planned, PreValidated | Failed)
                | (PreValidated, Coded | Failed)
                | (Coded, PostValidated)
                | (PostValidated, Done)
        )
    }

    /// Check if this state ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Planned => write!(f, "PLANNED"),
            Self::PreValidated => write!(f, "PRE_VALIDATED"),
            Self::Coded => write!(f, "CODED"),
            Self::PostValidated => write!(f, "POST_VALIDATED"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Terminal result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    /// Plan steps in machining order; empty when planning failed
    pub plan: Vec<PlanStep>,
    /// Emitted program; empty when no code was emitted
    pub program: String,
    /// True iff the run produced no errors
    pub valid: bool,
    /// Error records in detection order
    pub errors: Vec<ProcessError>,
    /// State the run ended in
    pub state: PipelineState,
    /// Name of the planner whose plan was used
    pub planner: String,
    /// Parameter fallbacks applied by the emitter
    pub warnings: Vec<ParameterFallback>,
}

/// Tracks the state of a single run and enforces legal transitions
struct Run {
    state: PipelineState,
}

impl Run {
    fn new() -> Self {
        Self {
            state: PipelineState::Init,
        }
    }

    fn advance(&mut self, target: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "illegal pipeline transition {} -> {}",
            self.state,
            target
        );
        debug!(from = %self.state, to = %target, "Pipeline transition");
        self.state = target;
    }
}

/// Orchestrator over a shared, read-only knowledge base
#[derive(Debug, Clone)]
pub struct Pipeline<'kb> {
    kb: &'kb KnowledgeBase,
    emitter: CodeEmitter,
}

impl<'kb> Pipeline<'kb> {
    /// Create a pipeline with default emitter options
    pub fn new(kb: &'kb KnowledgeBase) -> Self {
        Self {
            kb,
            emitter: CodeEmitter::default(),
        }
    }

    /// Builder method to set the emitter options
    pub fn with_emitter_options(mut self, options: EmitterOptions) -> Self {
        self.emitter = CodeEmitter::new(options);
        self
    }

    /// Knowledge base used by this pipeline
    pub fn knowledge_base(&self) -> &'kb KnowledgeBase {
        self.kb
    }

    /// Run with the rule-based planner
    pub fn run(&self, spec: &PartSpec) -> PipelineResult {
        self.run_with_planner(spec, &RuleBasedPlanner)
    }

    /// Run with the given synchronous planner
    pub fn run_with_planner(&self, spec: &PartSpec, planner: &dyn Planner) -> PipelineResult {
        info!(material = %spec.material, holes = spec.holes.len(), planner = planner.name(), "Planning");
        let mut run = Run::new();
        let planned = resolve_material(spec, self.kb).and_then(|_| planner.generate(spec, self.kb));
        run.advance(PipelineState::Planned);

        match planned {
            Ok(plan) => {
                let report = validate_plan(&plan);
                self.finish(run, plan, report, planner.name())
            }
            Err(err) => self.fail_planning(run, err, planner.name()),
        }
    }

    /// Run with an alternate planner, falling back to the rule-based planner
    ///
    /// The alternate is awaited for at most `timeout`. An error, a timeout, a
    /// plan that does not match the part (see [`check_plan_shape`]) or a plan
    /// that fails validation each fall back to [`RuleBasedPlanner`]; the
    /// caller always receives a well-formed result.
    pub async fn run_with_alternate(
        &self,
        spec: &PartSpec,
        alternate: &dyn AlternatePlanner,
        timeout: Duration,
    ) -> PipelineResult {
        if let Err(err) = resolve_material(spec, self.kb) {
            let mut run = Run::new();
            run.advance(PipelineState::Planned);
            return self.fail_planning(run, err, alternate.name());
        }

        info!(
            material = %spec.material,
            planner = alternate.name(),
            timeout_ms = timeout.as_millis() as u64,
            "Trying alternate planner"
        );
        let outcome = match tokio::time::timeout(timeout, alternate.generate(spec, self.kb)).await
        {
            Ok(result) => result,
            Err(_) => Err(AlternatePlanError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
        .and_then(|plan| check_plan_shape(&plan, spec).map(|()| plan));

        match outcome {
            Ok(plan) => {
                let report = validate_plan(&plan);
                if report.is_valid() {
                    let mut run = Run::new();
                    run.advance(PipelineState::Planned);
                    return self.finish(run, plan, report, alternate.name());
                }
                warn!(
                    planner = alternate.name(),
                    errors = report.errors.len(),
                    "Alternate plan rejected, falling back to rule-based planner"
                );
            }
            Err(err) => {
                warn!(
                    planner = alternate.name(),
                    error = %err,
                    "Alternate planner failed, falling back to rule-based planner"
                );
            }
        }

        self.run(spec)
    }

    fn fail_planning(&self, mut run: Run, err: ProcessError, planner: &str) -> PipelineResult {
        error!(error = %err, planner, "Planning failed");
        run.advance(PipelineState::Failed);
        PipelineResult {
            plan: Vec::new(),
            program: String::new(),
            valid: false,
            errors: vec![err],
            state: run.state,
            planner: planner.to_string(),
            warnings: Vec::new(),
        }
    }

    fn finish(
        &self,
        mut run: Run,
        plan: Plan,
        report: ValidationReport,
        planner: &str,
    ) -> PipelineResult {
        info!(steps = plan.len(), planner, "Plan created\n{}", plan.pretty());

        run.advance(PipelineState::PreValidated);
        if !report.is_valid() {
            error!(errors = ?report.errors, "Plan validation failed");
            run.advance(PipelineState::Failed);
            return PipelineResult {
                plan: plan.steps,
                program: String::new(),
                valid: false,
                errors: report.errors,
                state: run.state,
                planner: planner.to_string(),
                warnings: Vec::new(),
            };
        }

        let program = self.emitter.emit(&plan, self.kb);
        run.advance(PipelineState::Coded);

        let report = validate_program(&program.text);
        run.advance(PipelineState::PostValidated);
        if !report.is_valid() {
            error!(errors = ?report.errors, "Program validation failed");
        }

        run.advance(PipelineState::Done);
        info!(valid = report.is_valid(), warnings = program.fallbacks.len(), "Done");
        PipelineResult {
            plan: plan.steps,
            program: program.text,
            valid: report.is_valid(),
            errors: report.errors,
            state: run.state,
            planner: planner.to_string(),
            warnings: program.fallbacks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use processkit_core::HoleSpec;

    #[test]
    fn test_state_transitions() {
        use PipelineState::*;
        assert!(Init.can_transition_to(Planned));
        assert!(Planned.can_transition_to(Failed));
        assert!(PreValidated.can_transition_to(Failed));
        assert!(PostValidated.can_transition_to(Done));
        assert!(!Init.can_transition_to(Coded));
        assert!(!PreValidated.can_transition_to(Done));
        assert!(!Coded.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Init));
        assert!(!Failed.can_transition_to(Planned));
        assert!(Done.is_terminal() && Failed.is_terminal());
    }

    #[test]
    fn test_state_serializes_screaming_snake_case() {
        let value = serde_json::to_value(PipelineState::PreValidated).unwrap();
        assert_eq!(value, "PRE_VALIDATED");
    }

    #[test]
    fn test_invalid_hole_stops_before_emission() {
        let kb = KnowledgeBase::bundled().unwrap();
        let spec = PartSpec::new("aluminum_6061").with_hole(HoleSpec::new(6.0, 0.0, 0.0, 0.0));
        let result = Pipeline::new(&kb).run(&spec);
        assert_eq!(result.state, PipelineState::Failed);
        assert_eq!(result.plan.len(), 2);
        assert!(result.program.is_empty());
        assert_eq!(
            result.errors,
            vec![ProcessError::InvalidDepth {
                step: 1,
                depth: Some(0.0)
            }]
        );
    }
}
