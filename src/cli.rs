use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "screenshot-server")]
#[command(about = "HTTP screenshot service backed by headless Chrome")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, help = "Port the HTTP server listens on")]
    pub port: Option<u16>,

    #[arg(long, help = "Bind address")]
    pub bind: Option<String>,

    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Screenshot timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Expose Prometheus metrics on GET /metrics")]
    pub metrics: bool,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    Ok(())
}
