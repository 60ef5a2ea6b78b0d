//! TxVault command-line session
//!
//! Reads commands from a script file or stdin and prints results to stdout

use clap::Parser;
use std::path::PathBuf;
use tokio::{fs::File, io::BufReader, runtime, signal, sync::broadcast};
use tracing_subscriber::EnvFilter;
use txvault::{Result, Session, SessionConfig};

/// In-memory key-value store with nested transactions
#[derive(Parser)]
#[command(name = "txvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Read commands from this file instead of stdin
    script: Option<PathBuf>,

    /// JSON session configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prompt written before each command
    #[arg(long)]
    prompt: Option<String>,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(prompt) = cli.prompt {
        config.prompt = Some(prompt);
    }

    let runtime = runtime::Builder::new_current_thread().enable_all().build()?;
    let result = runtime.block_on(run_session(cli.script, config));

    // A blocking stdin read cannot be cancelled, so don't wait for it
    runtime.shutdown_background();
    result
}

async fn run_session(script: Option<PathBuf>, config: SessionConfig) -> Result<()> {
    // Ctrl+C ends the session after the command in flight
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = shutdown_tx.send(());
    });

    let mut session = Session::new(config);
    let stdout = tokio::io::stdout();
    match script {
        Some(path) => {
            let file = File::open(&path).await?;
            session.run(BufReader::new(file), stdout, shutdown_rx).await?;
        }
        None => {
            session
                .run(BufReader::new(tokio::io::stdin()), stdout, shutdown_rx)
                .await?;
        }
    }

    Ok(())
}
