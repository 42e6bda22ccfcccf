//! Replay binary for `jabber_events`.
//!
//! Reads a JSON-lines script of decoded protocol events and prints every
//! merged presence and assembled message notification.

mod cli;
mod replay;

use std::{path::Path, process::ExitCode};

use clap::Parser;
use jabber_events::{Config, EventRouter};
use tokio::io::{self, BufReader};

use crate::replay::ScriptError;

async fn load_config(cli: &cli::Cli) -> Result<Config, ScriptError> {
    let base = match &cli.config {
        Some(path) => read_config(path).await?,
        None => Config::default(),
    };
    if cli.timeout_ms.is_none() && cli.placeholder.is_none() {
        return Ok(base);
    }
    let mut builder = Config::builder()
        .fragment_timeout(base.fragment_timeout())
        .placeholder(base.placeholder())
        .max_pending(base.max_pending().get())
        .max_fragments(base.max_fragments().get())
        .status_policy(base.status_policy().clone());
    if let Some(ms) = cli.timeout_ms {
        builder = builder.fragment_timeout(std::time::Duration::from_millis(ms));
    }
    if let Some(placeholder) = &cli.placeholder {
        builder = builder.placeholder(placeholder.clone());
    }
    builder.build().map_err(|err| ScriptError::Config {
        path: cli.config.clone().unwrap_or_default(),
        message: err.to_string(),
    })
}

async fn read_config(path: &Path) -> Result<Config, ScriptError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| ScriptError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    serde_json::from_str(&text).map_err(|err| ScriptError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

async fn run(cli: cli::Cli) -> Result<usize, ScriptError> {
    let config = load_config(&cli).await?;
    let router = EventRouter::new(&config);
    let mut stdout = io::stdout();
    match &cli.script {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            replay::replay(&router, BufReader::new(file), &mut stdout).await
        }
        None => replay::replay(&router, BufReader::new(io::stdin()), &mut stdout).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr so stdout stays machine readable.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = cli::Cli::parse();
    match run(cli).await {
        Ok(written) => {
            tracing::info!(written, "replay finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "replay failed");
            ExitCode::FAILURE
        }
    }
}
