use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use processkit::server::{self, AppState};
use processkit::{
    init_logging, load_knowledge_base, plan_part, render_report, validate_program, Config,
    KnowledgeBase, PartSpec, VERSION,
};
use processkit_settings::require_default_config_path;

/// Exit code for a run whose result is invalid
const EXIT_INVALID: u8 = 2;

/// ProcessKit - machining process planner
#[derive(Parser)]
#[command(name = "processkit")]
#[command(about = "Turn part specifications into validated pseudo G-code")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a part and print the result
    Plan {
        /// Part specification (JSON)
        spec: PathBuf,
        /// Knowledge base document (overrides the configured one)
        #[arg(long)]
        kb: Option<PathBuf>,
        /// Try the language model planner first
        #[arg(long)]
        llm: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check an existing program file
    Check {
        /// Program text file
        program: PathBuf,
    },
    /// List the knowledge base contents
    Kb {
        /// Knowledge base document (overrides the configured one)
        #[arg(long)]
        kb: Option<PathBuf>,
    },
    /// Serve `/health` and `/plan` over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
        /// Knowledge base document (overrides the configured one)
        #[arg(long)]
        kb: Option<PathBuf>,
    },
    /// Show the effective configuration
    Config {
        /// Write the defaults to the default config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging)?;
    debug!(version = VERSION, "Starting processkit");

    match cli.command {
        Commands::Plan {
            spec,
            kb,
            llm,
            format,
        } => plan(&config, &spec, kb.as_deref(), llm, format).await,
        Commands::Check { program } => check(&program),
        Commands::Kb { kb } => list_knowledge_base(&config, kb.as_deref()),
        Commands::Serve { addr, kb } => {
            let kb = knowledge_base_for(&config, kb.as_deref())?;
            server::serve(AppState::new(kb, config), addr).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { init } => show_config(&config, init),
    }
}

fn knowledge_base_for(config: &Config, kb: Option<&Path>) -> anyhow::Result<&'static KnowledgeBase> {
    let path = kb.or(config.knowledge_base.path.as_deref());
    load_knowledge_base(path).context("Failed to load knowledge base")
}

async fn plan(
    config: &Config,
    spec_path: &Path,
    kb: Option<&Path>,
    llm: bool,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(spec_path)
        .with_context(|| format!("Failed to read {}", spec_path.display()))?;
    let spec = PartSpec::from_json_str(&text)
        .with_context(|| format!("Failed to parse part specification {}", spec_path.display()))?;
    let kb = knowledge_base_for(config, kb)?;

    let result = plan_part(&spec, kb, config, llm || config.llm.enabled).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print!("{}", render_report(&result)),
    }

    Ok(if result.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_INVALID)
    })
}

fn check(program: &Path) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(program)
        .with_context(|| format!("Failed to read {}", program.display()))?;
    let report = validate_program(&text);

    if report.is_valid() {
        println!("{}: OK", program.display());
        return Ok(ExitCode::SUCCESS);
    }
    for error in &report.errors {
        println!("{}: {}", program.display(), error);
    }
    Ok(ExitCode::from(EXIT_INVALID))
}

fn list_knowledge_base(config: &Config, kb: Option<&Path>) -> anyhow::Result<ExitCode> {
    let kb = knowledge_base_for(config, kb)?;

    println!("Materials:");
    for (id, material) in kb.materials() {
        println!(
            "  {:<16} {:>6} rpm  {:>7.1} mm/min  {}",
            id, material.recommended_rpm, material.recommended_feed_rate, material.notes
        );
    }

    println!("Tools:");
    for (id, tool) in kb.tools() {
        println!(
            "  {:<16} {:<8} {:>6.3} mm  {} flutes  {}",
            id,
            tool.kind.as_str(),
            tool.diameter,
            tool.flutes,
            tool.material
        );
    }

    println!("Operations:");
    for (id, operation) in kb.operations() {
        println!(
            "  {:<16} default {:<14} {}",
            id, operation.default_tool, operation.description
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn show_config(config: &Config, init: bool) -> anyhow::Result<ExitCode> {
    if init {
        let path = require_default_config_path()?;
        if path.exists() {
            anyhow::bail!("{} already exists", path.display());
        }
        Config::default().save_to_file(&path)?;
        info!(path = %path.display(), "Wrote default configuration");
        println!("{}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", config.to_toml_string()?);
    Ok(ExitCode::SUCCESS)
}
