//! Tutorgen CLI - multi-agent tutorial generator
//!
//! A command-line interface for generating markdown tutorials with the
//! tutorgen pipeline.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

mod config;
mod display;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;
use tutorgen::prelude::*;

use crate::config::{TutorConfig, config_path as default_config_path};
use crate::display::TerminalObserver;
use crate::error::{CliError, Result};

/// Tutorgen - generate markdown tutorials with a team of LLM agents
#[derive(Parser)]
#[command(name = "tutorgen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "TUTORGEN_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a tutorial
    Generate(GenerateArgs),

    /// Show configuration and environment status
    Status,

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the generate command
#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct GenerateArgs {
    /// Tutorial topic
    topic: String,

    /// Target audience (overrides config)
    #[arg(short, long)]
    audience: Option<String>,

    /// Output language (overrides config)
    #[arg(short, long)]
    language: Option<String>,

    /// Number of sections (overrides config)
    #[arg(short, long)]
    sections: Option<usize>,

    /// Write the tutorial to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Skip topic analysis
    #[arg(long)]
    no_analysis: bool,

    /// Search every section when the topic is time-sensitive
    #[arg(long)]
    force_search: bool,

    /// Disable web search
    #[arg(long)]
    no_search: bool,

    /// Rewrite every section for beginners after generation
    #[arg(long)]
    simplify: bool,

    /// Only print finished sections, not every activity
    #[arg(short, long)]
    quiet: bool,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show configuration file contents
    Show,
    /// Show configuration file path
    Path,
    /// Create a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
///
/// Logs go to stderr so a tutorial printed to stdout can be piped.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tutorgen={level},tutorgen_cli={level},{}",
            if verbosity >= 3 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let config_file = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Generate(args) => cmd_generate(args, config_file).await,
        Commands::Status => cmd_status(config_file).await,
        Commands::Config(args) => cmd_config(args, config_file).await,
    }
}

/// Generate a tutorial.
async fn cmd_generate(args: GenerateArgs, config_file: PathBuf) -> Result<()> {
    let mut config = config::load_effective(&config_file).await?;

    if let Some(model) = args.model {
        config.llm.model = model;
    }
    if args.no_analysis {
        config.pipeline.analyze_topic = false;
    }
    if args.force_search {
        config.pipeline.time_sensitivity = TimeSensitivity::ForceSearch;
    }

    let pipeline = build_pipeline(&config, !args.no_search)?;

    let request = TutorialRequest::new(args.topic)
        .audience(args.audience.unwrap_or(config.pipeline.audience))
        .language(args.language.unwrap_or(config.pipeline.language))
        .sections(args.sections.unwrap_or(config.pipeline.sections));
    request.validate()?;

    let cancel = CancelSignal::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current step");
                cancel.cancel_with_reason("interrupted");
            }
        })
    };

    let observer = TerminalObserver::new(request.num_sections, args.quiet);
    let mut run = pipeline.run(request, &observer, &cancel).await;

    if args.simplify && !cancel.is_cancelled() {
        run.sections = simplify_all(&pipeline, &run, &cancel).await;
    }
    ctrl_c.abort();

    if !run.sections.is_empty() {
        let markdown = run.to_markdown();
        match &args.output {
            Some(path) => {
                tokio::fs::write(path, &markdown).await?;
                info!(path = %path.display(), sections = run.sections.len(), "tutorial written");
            }
            None => println!("{markdown}"),
        }
    }

    match &run.status {
        RunStatus::Complete => Ok(()),
        RunStatus::Failed { .. } => Err(CliError::Incomplete(run.status.to_string())),
    }
}

/// Wire key pool, model client, search and pipeline from configuration.
fn build_pipeline(config: &TutorConfig, search: bool) -> Result<TutorialPipeline> {
    let pool = Arc::new(KeyPool::new(config.api_keys()?)?);
    let provider = OpenAI::new(config.openai_config())?;
    info!(
        model = %provider.model(),
        base_url = %provider.base_url(),
        keys = pool.len(),
        "model client ready"
    );

    let invoker = Invoker::with_provider(pool, provider);
    let mut pipeline = TutorialPipeline::new(invoker.clone())
        .with_config(config.pipeline.pipeline_config());

    if search && config.search.enabled {
        let resolver = SearchResolver::standard(
            invoker,
            config.search.serper_api_key.clone(),
            Duration::from_secs(config.search.timeout_secs),
        )?
        .with_config(config.search.resolver_config());
        info!(strategies = ?resolver.strategy_names(), "web search enabled");
        pipeline = pipeline.with_resolver(resolver);
    }

    Ok(pipeline)
}

/// Simplify every recorded section, keeping the original when a rewrite fails.
async fn simplify_all(
    pipeline: &TutorialPipeline,
    run: &TutorialRun,
    cancel: &CancelSignal,
) -> Vec<SectionArtifact> {
    let mut sections = Vec::with_capacity(run.sections.len());

    for section in &run.sections {
        if cancel.is_cancelled() {
            sections.push(section.clone());
            continue;
        }
        match pipeline.simplify(section, &run.request.language).await {
            Ok(simplified) => sections.push(simplified),
            Err(e) => {
                warn!(heading = %section.heading, error = %e, "simplification failed, keeping original");
                sections.push(section.clone());
            }
        }
    }

    sections
}

/// Show status.
async fn cmd_status(config_file: PathBuf) -> Result<()> {
    println!("Tutorgen Status\n");

    println!("Configuration:");
    println!("  Path:   {}", config_file.display());
    println!(
        "  Exists: {}",
        if config_file.exists() { "yes" } else { "no" }
    );

    match config::load_effective(&config_file).await {
        Ok(config) => {
            println!("  Valid:  yes");
            println!();
            println!("Model:");
            println!("  Name:     {}", config.llm.model);
            println!("  Endpoint: {}", config.llm.base_url);
            println!(
                "  API keys: {}",
                config.api_keys().map_or(0, |keys| keys.len())
            );
            println!();
            println!("Search:");
            println!(
                "  Enabled:  {}",
                if config.search.enabled { "yes" } else { "no" }
            );
            println!(
                "  Fallback: {}",
                if config.search.serper_api_key.is_some() {
                    "serper"
                } else {
                    "-"
                }
            );
        }
        Err(e) => {
            println!("  Valid:  no ({e})");
        }
    }

    println!();
    println!("Environment:");
    print_env_status("TUTORGEN_API_KEYS");
    print_env_status("SERPER_API_KEY");
    print_env_status("TUTORGEN_MODEL");
    print_env_status("TUTORGEN_BASE_URL");

    Ok(())
}

/// Configuration management.
async fn cmd_config(args: ConfigArgs, config_file: PathBuf) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", config_file.display());
        }
        ConfigCommands::Show => {
            if config_file.exists() {
                let content = tokio::fs::read_to_string(&config_file).await?;
                println!("{content}");
            } else {
                println!("Configuration file does not exist.");
                println!("Run 'tutorgen config init' to create one.");
            }
        }
        ConfigCommands::Init { force } => {
            if config::init_config(&config_file, force).await? {
                println!("Configuration created: {}", config_file.display());
                println!();
                println!("Next steps:");
                println!("  1. add your keys under [llm] api_keys, or");
                println!("     export TUTORGEN_API_KEYS=<key1>,<key2>");
                println!("  2. tutorgen generate \"Rust ownership\"");
            } else {
                println!("Configuration already exists at: {}", config_file.display());
                println!("Use --force to overwrite.");
            }
        }
    }

    Ok(())
}

/// Print environment variable status.
fn print_env_status(name: &str) {
    let status = if std::env::var(name).is_ok() {
        "set"
    } else {
        "-"
    };
    println!("  {name}: {status}");
}
