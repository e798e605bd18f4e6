use anyhow::Context;
use appraisal_probe::domain::model::AnalysisEnvelope;
use appraisal_probe::utils::logger::{init_logger, LogFormat};
use appraisal_probe::vision::request::{handle_request, API_KEY_ENV};
use appraisal_probe::ProbeConfig;
use clap::Parser;

#[derive(Parser)]
#[command(name = "vision-analyze")]
#[command(about = "Analyze vehicle photos with the vision model and print the result as JSON")]
struct Args {
    /// Request JSON: {"photoUrls": [...], "submissionData": {...}}
    request: String,

    /// Optional TOML config providing the [vision] section
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> anyhow::Result<ProbeConfig> {
    match &args.config {
        Some(path) => ProbeConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path)),
        None => Ok(ProbeConfig::default()),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logger(LogFormat::Compact, args.verbose);

    let envelope = match load_config(&args) {
        Ok(config) => handle_request(&args.request, config, std::env::var(API_KEY_ENV).ok()).await,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            AnalysisEnvelope::failure(format!("{:#}", e))
        }
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("❌ Failed to serialize result: {}", e);
            std::process::exit(1);
        }
    }

    if !envelope.success {
        std::process::exit(1);
    }
}
