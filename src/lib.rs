//! # ProcessKit
//!
//! A rule-based machining process planner. A part specification (material
//! and holes) is turned into an ordered process plan, checked, rendered as
//! pseudo G-code and checked again.
//!
//! ## Architecture
//!
//! ProcessKit is organized as a workspace with multiple crates:
//!
//! 1. **processkit-core** - Domain types, knowledge base, plan model
//! 2. **processkit-camtools** - Planners, validators, code emitter, pipeline
//! 3. **processkit-settings** - Configuration files and environment overrides
//! 4. **processkit** - Command line binary and HTTP server that integrate all crates

pub mod server;

pub use processkit_camtools::{
    validate_plan, validate_program, AlternatePlanner, CodeEmitter, EmitterOptions,
    HttpLlmClient, HttpLlmClientConfig, LlmClient, LlmPlanner, LlmPlannerConfig,
    ParameterFallback, Pipeline, PipelineResult, PipelineState, Planner, ProcessError,
    RuleBasedPlanner, ValidationReport,
};
pub use processkit_core::{
    knowledge_base, load_knowledge_base, HoleSpec, KnowledgeBase, Material, Operation,
    OperationKind, PartSpec, Plan, PlanStep, Tool,
};
pub use processkit_settings::{
    Config, EmitterSettings, LlmSettings, LogFormat, LoggingSettings, SettingsError,
};

use std::fmt::Write as _;
use std::time::Duration;
use tracing::warn;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging from the logging settings
///
/// Events go to stderr so that program text on stdout stays clean.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match settings.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_line_number(true)
                .pretty();
            registry.with(fmt_layer).try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json();
            registry.with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}

/// Emitter geometry from the settings section
pub fn emitter_options(settings: &EmitterSettings) -> EmitterOptions {
    EmitterOptions {
        safe_z: settings.safe_z,
        face_width: settings.face_width,
        face_length: settings.face_length,
    }
}

/// Build the language model planner described by the settings
pub fn llm_planner(settings: &LlmSettings) -> anyhow::Result<LlmPlanner<HttpLlmClient>> {
    let client = HttpLlmClient::new(HttpLlmClientConfig {
        endpoint: settings.endpoint.clone(),
        api_key: settings.api_key.clone(),
        timeout_secs: settings.timeout_secs,
    })?;
    Ok(LlmPlanner::new(
        client,
        LlmPlannerConfig {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        },
    ))
}

/// Plan one part with the configured pipeline
///
/// The language model planner is tried only when `use_llm` is set and the
/// settings make it available; otherwise the rule-based planner runs alone.
pub async fn plan_part(
    spec: &PartSpec,
    kb: &KnowledgeBase,
    config: &Config,
    use_llm: bool,
) -> anyhow::Result<PipelineResult> {
    let pipeline = Pipeline::new(kb).with_emitter_options(emitter_options(&config.emitter));

    if !use_llm {
        return Ok(pipeline.run(spec));
    }
    if !config.llm.is_available() {
        warn!("Language model planner requested but no API key is set, using rule-based planner");
        return Ok(pipeline.run(spec));
    }

    let planner = llm_planner(&config.llm)?;
    let timeout = Duration::from_secs(config.llm.timeout_secs);
    Ok(pipeline.run_with_alternate(spec, &planner, timeout).await)
}

/// Human readable report of a pipeline result
pub fn render_report(result: &PipelineResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Planner: {}", result.planner);
    let _ = writeln!(out, "State:   {}", result.state);
    let _ = writeln!(out, "Valid:   {}", result.valid);

    if !result.plan.is_empty() {
        out.push_str("\nPlan:\n");
        for (index, step) in result.plan.iter().enumerate() {
            let _ = writeln!(out, "{:>3}. {}", index, step);
        }
    }

    if !result.errors.is_empty() {
        out.push_str("\nErrors:\n");
        for error in &result.errors {
            let _ = writeln!(out, "  - {}", error);
        }
    }

    if !result.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            let _ = writeln!(out, "  - {}", warning);
        }
    }

    if !result.program.is_empty() {
        out.push_str("\nProgram:\n");
        out.push_str(&result.program);
        if !result.program.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_options_from_settings() {
        let settings = EmitterSettings {
            safe_z: 12.0,
            face_width: 30.0,
            face_length: 40.0,
        };
        let options = emitter_options(&settings);
        assert_eq!(options.safe_z, 12.0);
        assert_eq!(options.face_width, 30.0);
        assert_eq!(options.face_length, 40.0);
    }

    #[tokio::test]
    async fn test_plan_part_without_api_key_uses_rule_based() {
        let kb = KnowledgeBase::bundled().unwrap();
        let mut config = Config::default();
        config.llm.enabled = true;
        let spec = PartSpec::new("aluminum_6061").with_hole(HoleSpec::new(6.0, 10.0, 25.0, 25.0));

        let result = plan_part(&spec, &kb, &config, true).await.unwrap();
        assert_eq!(result.planner, "rule-based");
        assert_eq!(result.state, PipelineState::Done);
        assert!(result.valid);
    }

    #[test]
    fn test_render_report_lists_errors() {
        let kb = KnowledgeBase::bundled().unwrap();
        let spec = PartSpec::new("unobtainium");
        let result = Pipeline::new(&kb).run(&spec);
        let report = render_report(&result);
        assert!(report.contains("State:   FAILED"));
        assert!(report.contains("Unknown material: unobtainium"));
        assert!(!report.contains("Program:"));
    }
}
