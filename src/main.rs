use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use narrative_workshop::app::{handle_fatal_error, init_logging, AppConfig};
use narrative_workshop::controller::StageController;
use narrative_workshop::generation::AnthropicClient;
use narrative_workshop::model::EssayRequest;
use narrative_workshop::rules::{RuleEngine, Severity};
use narrative_workshop::server;

/// Staged essay workshop: analysis, rewrite suggestions and validation
#[derive(Parser)]
#[command(name = "narrative-workshop", version)]
#[command(about = "Workshop a personal essay in three validated stages", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the stage dispatch endpoint over HTTP
    Serve {
        /// Address to bind (overrides configuration)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run all three stages in-process and print the final result as JSON
    Run {
        /// File containing the essay text
        #[arg(long)]
        essay: PathBuf,

        /// The essay prompt
        #[arg(long)]
        prompt: String,

        /// Essay type, e.g. "personal statement"
        #[arg(long)]
        essay_type: Option<String>,

        /// Essay title
        #[arg(long)]
        title: Option<String>,
    },
    /// Run the deterministic rule engine over a file and list findings
    Check {
        /// File to check
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_config = AppConfig::new(cli.verbose).with_config_path(cli.config);
    init_logging(&app_config);

    let result = match cli.command {
        Commands::Serve { bind } => run_serve(&app_config, bind).await,
        Commands::Run {
            essay,
            prompt,
            essay_type,
            title,
        } => run_pipeline(&app_config, essay, prompt, essay_type, title).await,
        Commands::Check { file } => run_check(file),
    };

    if let Err(e) = result {
        handle_fatal_error(e, app_config.verbose);
    }
}

fn build_controller(app_config: &AppConfig) -> anyhow::Result<(StageController, String)> {
    let config = app_config.pipeline_config()?;
    let bind = config.server.bind.clone();
    let client = AnthropicClient::new(config.generation.clone())?;
    Ok((StageController::new(Arc::new(client), config), bind))
}

async fn run_serve(app_config: &AppConfig, bind: Option<String>) -> anyhow::Result<()> {
    let (controller, configured_bind) = build_controller(app_config)?;
    let bind = bind.unwrap_or(configured_bind);
    server::serve(Arc::new(controller), &bind).await?;
    Ok(())
}

async fn run_pipeline(
    app_config: &AppConfig,
    essay: PathBuf,
    prompt: String,
    essay_type: Option<String>,
    title: Option<String>,
) -> anyhow::Result<()> {
    let essay_text = std::fs::read_to_string(&essay)
        .with_context(|| format!("Failed to read essay from {}", essay.display()))?;
    let mut request = EssayRequest::new(essay_text, prompt);
    if let Some(essay_type) = essay_type {
        request = request.with_essay_type(essay_type);
    }
    if let Some(title) = title {
        request = request.with_title(title);
    }

    let (controller, _) = build_controller(app_config)?;
    let result = controller.run_to_completion(request).await?;
    info!(
        retained = result.summary.retained_items,
        dropped = result.summary.dropped_items,
        "workshop complete"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_check(file: PathBuf) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let findings = RuleEngine::standard().check(&text);

    if findings.is_empty() {
        println!("No findings.");
        return Ok(());
    }
    for finding in &findings {
        let marker = match finding.severity {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
        };
        println!(
            "[{marker}] {}: \"{}\" - {}",
            finding.category.as_str(),
            finding.evidence,
            finding.fix_hint
        );
    }
    Ok(())
}
