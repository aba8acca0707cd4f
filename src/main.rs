//! ReportSmith - agent-orchestrated document analysis reports
//!
//! A CLI tool that fans a document out to several LLM-backed analysis
//! agents running in parallel on a local Ollama model, merges their
//! outputs into a templated report and writes the report artifact.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Request rejected or runtime error (config, store, I/O, etc.)

mod agent;
mod analysis;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod pipeline;
mod report;
mod store;

use agent::AgentRegistry;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use llm::{LanguageModel, OllamaClient, OllamaConfig};
use models::{AnalysisRequest, ReportResponse};
use pipeline::ReportPipeline;
use report::{
    generate_json_response, generate_markdown_response, MarkdownChartRenderer,
    MarkdownDocumentRenderer,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use store::DirectoryStore;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `general.verbose` applies
    let config = match load_config(&args) {
        Ok(mut config) => {
            config.merge_with_args(&args);
            config
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(config.log_level(&args));

    info!("ReportSmith v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match args.config {
        Some(ref path) => info!("Loaded config from {}", path.display()),
        None if Path::new(CONFIG_FILE_NAME).exists() => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME)
        }
        None => debug!("No config file found, using defaults"),
    }

    match run_report(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Report failed: {}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .reportsmith.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, context limits and engine.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one report request. Returns the exit code.
async fn run_report(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let request = build_request(&args)?;
    let pipeline = build_pipeline(&config, !args.quiet)?;

    if args.dry_run {
        return handle_dry_run(&pipeline, &request);
    }

    if !args.quiet {
        eprintln!("Model: {} ({})", config.model.name, config.model.ollama_url);
    }

    let response = pipeline.run(&request).await;
    let duration = start_time.elapsed().as_secs_f64();
    info!("Request finished in {:.1}s at stage {}", duration, response.stage);

    write_response(&args, &response)?;

    if response.success {
        Ok(0)
    } else {
        Ok(1)
    }
}

/// Turn the CLI arguments into a request, reading `--text-file` if given.
fn build_request(args: &Args) -> Result<AnalysisRequest> {
    let mut request = AnalysisRequest::new(args.user_id(), args.report_type.clone());

    if let Some(ref keyword) = args.keyword {
        request = request.with_keyword(keyword.clone());
    }

    if let Some(ref text) = args.text {
        request = request.with_text(text.clone());
    } else if let Some(ref path) = args.text_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;
        request = request.with_text(text);
    }

    Ok(request)
}

/// Wire the store, model and renderers into a pipeline.
fn build_pipeline(config: &Config, show_progress: bool) -> Result<ReportPipeline> {
    let model: Arc<dyn LanguageModel> = Arc::new(
        OllamaClient::new(OllamaConfig::from(&config.model))
            .context("Failed to create Ollama client")?,
    );
    debug!("Using model {}", model.name());
    let registry = AgentRegistry::from_model(model.clone(), &config.context);

    debug!("Record store: {}", config.general.store_dir);
    let store = Arc::new(DirectoryStore::new(&config.general.store_dir));

    let output_dir = &config.general.output_dir;
    Ok(ReportPipeline::new(
        store,
        registry,
        model,
        Arc::new(MarkdownChartRenderer::new(output_dir)),
        Arc::new(MarkdownDocumentRenderer::new(output_dir)),
        config,
    )
    .with_progress(show_progress))
}

/// Print the execution plan without calling the model.
fn handle_dry_run(pipeline: &ReportPipeline, request: &AnalysisRequest) -> Result<i32> {
    eprintln!("\nDry run: assembling context (no LLM calls)...\n");

    let plan = match pipeline.plan(request) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("   {}", e);
            return Ok(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&plan)?);
    eprintln!("\nDry run complete. No LLM calls were made.");
    Ok(0)
}

/// Print the response or write it to `--output`.
fn write_response(args: &Args, response: &ReportResponse) -> Result<()> {
    let output = match args.format {
        OutputFormat::Json => generate_json_response(response)?,
        OutputFormat::Markdown => generate_markdown_response(response),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write response to {}", path.display()))?;
            if !args.quiet {
                eprintln!("Response written to {}", path.display());
            }
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: failed to load {}: {:#}", CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}
