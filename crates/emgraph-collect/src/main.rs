//! CLI entry point for emgraph-collect.
//!
//! Reads a JSON request from stdin, writes a JSON result to stdout.
//! Logs go to stderr.

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::{fmt, EnvFilter};

use emgraph_client::EmInfraClient;
use emgraph_collect::types::{CollectRequest, DeriveRequest, DeriveResult};
use emgraph_collect::{derive_pattern, CollectEngine, Pattern};
use emgraph_core::config::Settings;

#[derive(Parser)]
#[command(name = "emgraph-collect")]
#[command(about = "Pattern-driven subgraph collection for EM-Infra assets")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: emgraph).
    #[arg(short, long, default_value = "emgraph", global = true)]
    config: String,

    /// Override the API base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Collect and filter a subgraph (reads a CollectRequest from stdin).
    Collect,
    /// Derive a pattern from example assets and relations (reads a DeriveRequest from stdin).
    Derive,
    /// Validate a pattern (reads the pattern from stdin).
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)?;
    if let Some(base_url) = &cli.base_url {
        settings.client.base_url = base_url.clone();
    }

    match cli.command {
        Command::Collect => {
            let request: CollectRequest = read_stdin()?;
            let client = EmInfraClient::new(&settings.client)?;
            let engine = CollectEngine::new(client).with_config(settings.collector);
            let result = engine.run(request).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Derive => {
            let request: DeriveRequest = read_stdin()?;
            let pattern = derive_pattern(&request.assets, &request.relations)?;
            let result = DeriveResult {
                pattern: pattern.to_json(),
            };
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Validate => {
            let raw: serde_json::Value = read_stdin()?;
            let pattern = Pattern::from_json(&raw)?;
            let levels = pattern.level_map()?;
            let edges: Vec<String> = pattern.edges().iter().map(ToString::to_string).collect();
            let summary = serde_json::json!({
                "seed": pattern.seed_var(),
                "edges": edges,
                "levels": levels,
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}

fn read_stdin<T: DeserializeOwned>() -> anyhow::Result<T> {
    let input = std::io::read_to_string(std::io::stdin())?;
    Ok(serde_json::from_str(&input)?)
}
