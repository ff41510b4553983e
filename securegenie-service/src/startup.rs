//! Application startup and lifecycle management.

use crate::config::GenieConfig;
use crate::services::providers::anthropic::{AnthropicSettings, AnthropicTextProvider};
use crate::services::providers::TextProvider;
use crate::{build_router, AppState};
use service_core::error::AppError;
use service_core::middleware::rate_limit::{create_ip_rate_limiter, spawn_window_purger};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the Anthropic provider.
    pub async fn build(config: GenieConfig) -> Result<Self, AppError> {
        let provider = AnthropicTextProvider::new(AnthropicSettings {
            api_key: config.anthropic.api_key.clone(),
            api_url: config.anthropic.api_url.clone(),
            model: config.anthropic.model.clone(),
            timeout: Duration::from_secs(config.anthropic.timeout_seconds),
        })
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

        tracing::info!(
            model = %config.anthropic.model,
            "Initialized Anthropic text provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: GenieConfig,
        text_provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let rate_limiter = create_ip_rate_limiter(
            config.rate_limit.max_requests,
            config.rate_limit.window_seconds,
            config.rate_limit.trust_forwarded_for,
        );
        tracing::info!(
            max_requests = rate_limiter.max_requests(),
            window_seconds = rate_limiter.window().as_secs(),
            "Rate limiter initialized"
        );

        // Port 0 picks a random port, used by tests
        let addr = config.common.bind_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state: AppState {
                config,
                text_provider,
                rate_limiter,
            },
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let purge_every = Duration::from_secs(
            self.state.config.rate_limit.purge_interval_seconds.max(1),
        );
        let purger = spawn_window_purger(self.state.rate_limiter.clone(), purge_every);

        let app = build_router(self.state);

        tracing::info!(port = self.port, "Listening");

        let result = axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        purger.abort();

        if let Err(e) = &result {
            tracing::error!("HTTP server error: {}", e);
        }
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
