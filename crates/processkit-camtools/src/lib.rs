//! # ProcessKit CAM Tools
//!
//! Turns a part specification into a validated machining plan and an
//! illustrative pseudo G-code program.
//!
//! ## Components
//!
//! - **Planner**: rule-based plan generation from the knowledge base
//! - **Validator**: plan checks before emission, program checks after
//! - **Code Emitter**: deterministic template rendering of a plan
//! - **Pipeline**: state machine sequencing the above into one result
//! - **LLM Planner**: optional alternate planner behind a bounded timeout

pub mod code_emitter;
pub mod error;
pub mod llm_planner;
pub mod pipeline;
pub mod planner;
pub mod validator;

// Re-export commonly used items
pub use code_emitter::{
    CodeEmitter, EmitterOptions, FallbackParameter, ParameterFallback, Program, FOOTER_MARKER,
    HEADER_MARKER,
};
pub use error::{AlternatePlanError, LlmError, ProcessError, ProcessResult};
pub use llm_planner::{
    HttpLlmClient, HttpLlmClientConfig, LlmClient, LlmPlanner, LlmPlannerConfig, LlmRequest,
};
pub use pipeline::{Pipeline, PipelineResult, PipelineState};
pub use planner::{check_plan_shape, AlternatePlanner, Planner, RuleBasedPlanner};
pub use validator::{validate_plan, validate_program, ValidationReport};
