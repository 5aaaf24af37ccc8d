use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chat_gateway::config::{Cli, Config};
use chat_gateway::metrics::Metrics;
use chat_gateway::server::{build_router, AppState};
use chat_gateway::upstream::anthropic::AnthropicClient;
use chat_gateway::upstream::ChatProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "chat_gateway=debug,tower_http=debug"
    } else {
        "chat_gateway=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("chat-gateway v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    config.validate()?;
    let config = Arc::new(config);

    info!(
        base_url = %config.provider.base_url,
        model = %config.provider.model,
        max_tokens = config.provider.max_tokens,
        static_dir = ?config.server.static_dir,
        "Configuration loaded"
    );

    // The credential is read once; a missing key surfaces as provider errors.
    let api_key = cli.api_key.unwrap_or_default();
    if api_key.is_empty() {
        warn!("No API key configured, upstream requests will be rejected");
    }

    let provider: Arc<dyn ChatProvider> = Arc::new(AnthropicClient::new(&config.provider, api_key)?);

    let state = Arc::new(AppState::new(provider, config.clone(), Metrics::new()?));
    let app = build_router(state);

    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
