//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::DaemonConfig;
use crate::dispatch::Dispatcher;
use crate::error::{DaemonError, DaemonResult};
use mirror_chat::SlackClient;
use mirror_directory::{ChannelApi, MessageApi, SystemClock, UserDirectoryApi};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Mirror daemon server
pub struct Server {
    config: DaemonConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Create a server talking to the configured chat Web API
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let client = Arc::new(SlackClient::new(&config.chat)?);
        Ok(Self::with_backend(config, client))
    }

    /// Create a server over any chat backend
    pub fn with_backend<A>(config: DaemonConfig, api: Arc<A>) -> Self
    where
        A: ChannelApi + UserDirectoryApi + MessageApi + 'static,
    {
        let dispatcher = Dispatcher::new(
            api,
            Arc::new(SystemClock),
            config.cache.ttl(),
            config.chat.bot_username.clone(),
        );

        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Build the HTTP router for this server
    pub fn router(&self) -> axum::Router {
        let state = AppState::new(
            self.dispatcher.clone(),
            self.config.server.access_token.clone(),
        )
        .with_max_body_size(self.config.server.max_body_size);

        create_router(state)
    }

    /// Load the channel directory once. A failure is logged and the first
    /// cache miss retries the load.
    pub async fn warm(&self) {
        match self.dispatcher.channels().warm().await {
            Ok(count) => tracing::info!(channels = count, "Channel directory loaded"),
            Err(e) => tracing::error!(error = %e, "Failed to load channel directory"),
        }
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        self.warm().await;

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Mirror daemon listening on {}", addr);
        if self.config.server.access_token.is_none() {
            tracing::warn!("No access token configured; webhooks are accepted unauthenticated");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Mirror daemon shutting down");

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
