use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wyckoff_models::{SubjectId, WyckoffConfig};

#[derive(Parser, Debug)]
#[command(name = "wyckoff", about = "Multi-agent Wyckoff analysis")]
struct Cli {
    /// Six-digit A-share subject code (e.g. 300750)
    code: String,

    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config: WyckoffConfig = match &cli.config {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {path}"))?;
            toml::from_str(&config_str).with_context(|| "Failed to parse config")?
        }
        None => WyckoffConfig::default(),
    };

    // Reject bad codes before standing anything up.
    let subject: SubjectId = cli
        .code
        .parse()
        .with_context(|| format!("Invalid subject code: {}", cli.code))?;

    let orchestrator =
        wyckoff::build_orchestrator(&config).context("Failed to build orchestrator")?;

    let batch = orchestrator.analyze(&subject).await;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&batch)?
    } else {
        serde_json::to_string(&batch)?
    };
    println!("{output}");
    eprintln!(
        "{}: {:?} ({}), confidence {}",
        batch.subject, batch.consensus.signal, batch.consensus.strength, batch.consensus.confidence
    );

    Ok(())
}
