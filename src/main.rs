use anyhow::Context;
use clap::Parser;
use screenshot_server::{run_server, setup_logging, validate_config, AppState, Cli, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    info!("Starting screenshot-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config(&args).await?;

    // Build shared state; the browser launches lazily on first use
    let state = Arc::new(AppState::new(config.clone()).context("failed to build server state")?);

    // Setup graceful shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let _shutdown_handler = setup_shutdown_handler(shutdown_tx.clone());

    // Serve until a termination signal arrives
    let result = run_server(state.clone(), &config, shutdown_rx).await;

    // Graceful shutdown
    info!("Shutting down...");
    state.service.shutdown().await;

    if let Err(e) = result {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Screenshot server stopped");
    Ok(())
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        // Load from file
        let config_content = tokio::fs::read_to_string(config_path)
            .await
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        serde_json::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?
    } else {
        // Use default configuration
        Config::default()
    };

    // Override with CLI arguments
    if let Some(port) = args.port {
        config.port = port;
    }

    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }

    if let Some(timeout) = args.timeout {
        config.screenshot_timeout = Duration::from_secs(timeout);
    }

    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    if args.metrics {
        config.metrics_enabled = true;
    }

    // Validate configuration
    validate_config(&config)?;

    info!("Configuration loaded successfully");
    info!("Listening on: {}:{}", config.bind, config.port);
    info!("Screenshot timeout: {:?}", config.screenshot_timeout);
    info!(
        "Rate limit: {} requests per {:?}",
        config.rate_limit.max_requests, config.rate_limit.window
    );

    Ok(config)
}

fn setup_shutdown_handler(
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        let _ = shutdown_tx.send(());
    })
}
