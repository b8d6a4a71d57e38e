//! Error types for the process planning crate.
//!
//! [`ProcessError`] is the record attached to a pipeline result. Generation
//! errors abort a run, validation errors are collected. Each record carries the
//! index of the offending plan step where one applies.
//!
//! [`AlternatePlanError`] and [`LlmError`] never reach the caller of the
//! pipeline: an alternate planner failure triggers the rule-based fallback.

use serde::Serialize;
use thiserror::Error;

/// Pipeline error record
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ProcessError {
    /// Material identifier does not resolve in the knowledge base
    #[error("Unknown material: {material}")]
    UnknownMaterial {
        /// The identifier as supplied.
        material: String,
    },

    /// No drill matches the hole and no default drilling tool exists
    #[error("Step {step}: no tool for {diameter:.3} mm hole and no default drilling tool")]
    UnresolvedTool {
        /// Index of the drilling step.
        step: usize,
        /// Requested hole diameter (mm).
        diameter: f64,
    },

    /// Plan has no steps
    #[error("Plan is empty")]
    EmptyPlan,

    /// Step operation is not one of the supported operations
    #[error("Step {step}: unsupported operation '{operation}'")]
    UnsupportedOperation {
        /// Index of the step.
        step: usize,
        /// The operation tag as received.
        operation: String,
    },

    /// Depth is missing, zero or negative
    #[error("Step {step}: depth must be a positive number{}", format_depth(.depth))]
    InvalidDepth {
        /// Index of the step.
        step: usize,
        /// The offending depth, if one was given.
        depth: Option<f64>,
    },

    /// Drilling diameter or position is missing or malformed
    #[error("Step {step}: invalid geometry: {reason}")]
    InvalidGeometry {
        /// Index of the step.
        step: usize,
        /// What is wrong with the geometry.
        reason: String,
    },

    /// Program header marker missing or duplicated
    #[error("Program header marker missing or duplicated")]
    MissingHeader,

    /// Program end marker missing, duplicated or not on the last line
    #[error("Program end marker missing or not on the last line")]
    MissingFooter,

    /// Program text is empty
    #[error("Program is empty")]
    EmptyProgram,
}

fn format_depth(depth: &Option<f64>) -> String {
    match depth {
        Some(depth) => format!(" (got {})", depth),
        None => " (missing)".to_string(),
    }
}

impl ProcessError {
    /// Index of the offending step, if the error is tied to one
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::UnresolvedTool { step, .. }
            | Self::UnsupportedOperation { step, .. }
            | Self::InvalidDepth { step, .. }
            | Self::InvalidGeometry { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownMaterial { .. } => "UnknownMaterial",
            Self::UnresolvedTool { .. } => "UnresolvedTool",
            Self::EmptyPlan => "EmptyPlan",
            Self::UnsupportedOperation { .. } => "UnsupportedOperation",
            Self::InvalidDepth { .. } => "InvalidDepth",
            Self::InvalidGeometry { .. } => "InvalidGeometry",
            Self::MissingHeader => "MissingHeader",
            Self::MissingFooter => "MissingFooter",
            Self::EmptyProgram => "EmptyProgram",
        }
    }

    /// Check if this error is raised by a planner rather than a validator
    pub fn is_generation_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMaterial { .. } | Self::UnresolvedTool { .. }
        )
    }
}

/// Result type for planning operations
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Errors of the language model HTTP client
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Response(String),

    /// API key is not a valid header value
    #[error("Invalid API key header: {0}")]
    InvalidApiKey(String),
}

/// Errors of an alternate planner
#[derive(Error, Debug)]
pub enum AlternatePlanError {
    /// The backing client failed
    #[error("Language model request failed: {0}")]
    Llm(#[from] LlmError),

    /// Part material is not in the knowledge base
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    /// Reply did not contain a usable JSON plan
    #[error("Unusable planner output: {0}")]
    Parse(String),

    /// Plan does not have one face milling step followed by one drilling
    /// step per hole of the part, in order
    #[error("Plan does not match the part: {reason}")]
    ShapeMismatch {
        /// First difference found.
        reason: String,
    },

    /// Reply parsed but no step survived conversion
    #[error("Planner produced no usable steps")]
    NoSteps,

    /// The planner did not answer in time
    #[error("Planner timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_display() {
        let err = ProcessError::InvalidDepth {
            step: 2,
            depth: Some(-1.0),
        };
        assert_eq!(
            err.to_string(),
            "Step 2: depth must be a positive number (got -1)"
        );
        let err = ProcessError::InvalidDepth {
            step: 1,
            depth: None,
        };
        assert_eq!(
            err.to_string(),
            "Step 1: depth must be a positive number (missing)"
        );
    }

    #[test]
    fn test_process_error_serializes_kind_and_step() {
        let err = ProcessError::InvalidGeometry {
            step: 3,
            reason: "diameter must be positive".to_string(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "InvalidGeometry");
        assert_eq!(value["step"], 3);

        let value = serde_json::to_value(ProcessError::EmptyProgram).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "EmptyProgram"}));
    }

    #[test]
    fn test_step_and_kind_accessors() {
        let err = ProcessError::UnknownMaterial {
            material: "unobtainium".to_string(),
        };
        assert_eq!(err.step(), None);
        assert_eq!(err.kind(), "UnknownMaterial");
        assert!(err.is_generation_error());

        let err = ProcessError::UnsupportedOperation {
            step: 1,
            operation: "tapping".to_string(),
        };
        assert_eq!(err.step(), Some(1));
        assert!(!err.is_generation_error());
    }

    #[test]
    fn test_alternate_plan_error_display() {
        let err = AlternatePlanError::Timeout { timeout_ms: 250 };
        assert_eq!(err.to_string(), "Planner timed out after 250ms");
    }
}
