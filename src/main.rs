use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use llm_relay::{config, init_tracing, server};

#[derive(Parser, Debug)]
#[command(name = "llm-relay", version, about = "Chat-completion relay gateway")]
struct Cli {
    /// Configuration file path (optional; env vars alone are enough)
    #[arg(short, long, env = "LLM_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing();

    let config = config::load_config(args.config.as_deref())?;
    info!(
        backend = %config.backend.base_url,
        api_key_set = config.backend.api_key.is_some(),
        log_dir = %config.logging.dir.display(),
        "Loaded configuration"
    );

    server::start_server(config).await
}
