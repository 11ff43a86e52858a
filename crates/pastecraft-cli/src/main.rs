//! Pastecraft CLI
//!
//! Reads pasted text from stdin (or a file), runs it through the configured
//! rule chain, and writes the result to stdout. Notices and logs go to
//! stderr.

use anyhow::Result;
use clap::Parser;
use pastecraft_core::{LogSink, NotificationSink, NullSink};
use pastecraft_rules::{
    load_settings, JsonFileStore, RhaiEngine, RuleChainRunner, ScriptEngine, ShellEngine,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

mod config;

use config::{CliConfig, EngineKind};

#[derive(Parser, Debug)]
#[command(name = "pastecraft")]
#[command(about = "Rewrite pasted text with regex rules", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "pastecraft.yaml")]
    config: String,

    /// Settings file with the rule list
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Script engine for transform rules
    #[arg(short, long, value_enum)]
    engine: Option<EngineKind>,

    /// Read pasted text from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Suppress user notices
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = CliConfig::load(&cli.config, &cli)?;
    info!(
        settings = %config.settings_path.display(),
        engine = ?config.engine,
        "Configuration loaded"
    );

    let store = JsonFileStore::new(&config.settings_path);
    let settings = load_settings(&store)
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;

    let engine: Arc<dyn ScriptEngine> = match config.engine {
        EngineKind::Rhai => Arc::new(RhaiEngine::new()),
        EngineKind::Shell => Arc::new(ShellEngine::with_shell(&config.shell)),
    };

    let sink: Arc<dyn NotificationSink> = if cli.quiet {
        Arc::new(NullSink)
    } else {
        Arc::new(LogSink)
    };

    let runner = RuleChainRunner::new(settings, engine, sink);

    let pasted = match &cli.input {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let outcome = runner.run(&pasted).await;
    info!(changed = outcome.changed, "Paste processed");

    let mut stdout = tokio::io::stdout();
    stdout.write_all(outcome.result.as_bytes()).await?;
    stdout.flush().await?;

    Ok(())
}

/// Initialize tracing/logging on stderr
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("pastecraft=debug,pastecraft_rules=debug,pastecraft_core=debug")
    } else {
        EnvFilter::try_from_env("PASTECRAFT_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| {
                EnvFilter::new("pastecraft=info,pastecraft_rules=info,pastecraft_core=info")
            })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
