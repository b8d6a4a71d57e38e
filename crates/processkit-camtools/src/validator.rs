//! Plan and program validation
//!
//! Both phases collect every violation in one pass instead of stopping at the
//! first. Plan errors come out in ascending step order.

use serde::Serialize;
use tracing::debug;

use processkit_core::{DrillingStep, Plan, PlanStep};

use crate::code_emitter::{FOOTER_MARKER, HEADER_MARKER};
use crate::error::ProcessError;

/// Outcome of a validation phase
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Violations found, in detection order
    pub errors: Vec<ProcessError>,
}

impl ValidationReport {
    /// True iff no violation was found
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Split into the `(valid, errors)` pair
    pub fn into_parts(self) -> (bool, Vec<ProcessError>) {
        (self.errors.is_empty(), self.errors)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn check_depth(index: usize, depth: Option<f64>, errors: &mut Vec<ProcessError>) {
    match depth {
        Some(depth) if is_positive(depth) => {}
        depth => errors.push(ProcessError::InvalidDepth { step: index, depth }),
    }
}

fn check_drilling_geometry(index: usize, step: &DrillingStep, errors: &mut Vec<ProcessError>) {
    let mut problems = Vec::new();
    match step.diameter {
        None => problems.push("missing diameter".to_string()),
        Some(diameter) if !is_positive(diameter) => {
            problems.push(format!("diameter must be positive (got {})", diameter))
        }
        Some(_) => {}
    }
    match step.position {
        None => problems.push("missing position".to_string()),
        Some(position) if !position.iter().all(|c| c.is_finite()) => {
            problems.push("position coordinates must be finite".to_string())
        }
        Some(_) => {}
    }
    if !problems.is_empty() {
        errors.push(ProcessError::InvalidGeometry {
            step: index,
            reason: problems.join(", "),
        });
    }
}

/// Check a plan before code emission
///
/// Rules per step: the operation must be supported, any depth must be
/// positive (a drilling step must carry one), and drilling steps need a
/// positive diameter and a finite `[x, y]` position.
pub fn validate_plan(plan: &Plan) -> ValidationReport {
    let mut errors = Vec::new();

    if plan.is_empty() {
        errors.push(ProcessError::EmptyPlan);
    }

    for (index, step) in plan.steps.iter().enumerate() {
        match step {
            PlanStep::FaceMilling(face) => check_depth(index, Some(face.depth), &mut errors),
            PlanStep::Drilling(drilling) => {
                check_depth(index, drilling.depth, &mut errors);
                check_drilling_geometry(index, drilling, &mut errors);
            }
            PlanStep::Unsupported { tag } => errors.push(ProcessError::UnsupportedOperation {
                step: index,
                operation: tag.clone(),
            }),
        }
    }

    debug!(steps = plan.len(), errors = errors.len(), "Plan validated");
    ValidationReport { errors }
}

/// Check an emitted program for its structural markers
///
/// An empty program yields only `EmptyProgram`. Otherwise the header marker
/// must occur exactly once, and the end marker must occur exactly once as the
/// last non-blank line.
pub fn validate_program(program: &str) -> ValidationReport {
    if program.trim().is_empty() {
        return ValidationReport {
            errors: vec![ProcessError::EmptyProgram],
        };
    }

    let mut errors = Vec::new();
    let lines: Vec<&str> = program
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let headers = lines.iter().filter(|line| **line == HEADER_MARKER).count();
    if headers != 1 {
        errors.push(ProcessError::MissingHeader);
    }

    let footers = lines.iter().filter(|line| **line == FOOTER_MARKER).count();
    if footers != 1 || lines.last() != Some(&FOOTER_MARKER) {
        errors.push(ProcessError::MissingFooter);
    }

    debug!(lines = lines.len(), errors = errors.len(), "Program validated");
    ValidationReport { errors }
}
