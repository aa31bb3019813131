//! Mirror Daemon - tracker to chat channel mirroring
//!
//! The daemon provides:
//! - A webhook endpoint for tracker project and message events
//! - One chat channel per project, created, unarchived and archived on demand
//! - Invitations for project users who are not yet channel members

use clap::Parser;
use mirror_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mirror Daemon CLI
#[derive(Parser)]
#[command(name = "mirrord")]
#[command(about = "Mirror tracker projects into chat channels", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MIRROR_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "MIRROR_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, env = "MIRROR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "MIRROR_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if config.chat.token.is_empty() {
        return Err(DaemonError::Config(
            "chat.token is required (MIRROR_CHAT__TOKEN)".to_string(),
        ));
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        chat = %config.chat.base_url,
        ttl_minutes = config.cache.ttl_minutes,
        "Starting mirror daemon"
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
