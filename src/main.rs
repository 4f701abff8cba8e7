use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_relay::{
    config::Config,
    services::{ProcessRunner, TokioProcessRunner, tool_check},
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "audio-relay")]
#[command(version)]
#[command(about = "Relays YouTube audio and internet radio as live transcoded HTTP streams")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("audio_relay={},tower_http=trace", cli.log_level)
    } else {
        format!("audio_relay={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Audio Relay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner::new());

    // Probe external tools once; missing tools degrade /health but do not stop startup
    let tools = tool_check::check_tools(
        runner.as_ref(),
        &config.transcoder.command,
        &config.resolver.candidates,
    )
    .await;

    info!(
        "Relay limits: max_streams={}, max_lookups={}, startup_timeout={:?}",
        config.relay.max_concurrent_streams,
        config.relay.max_concurrent_lookups,
        config.relay.startup_timeout
    );

    let state = AppState::new(config, runner, tools)?;
    let server = WebServer::new(state)?;
    info!("Web server starting on {}:{}", server.host(), server.port());

    server.serve().await?;
    info!("Audio Relay stopped");
    Ok(())
}
