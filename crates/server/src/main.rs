//! Call agent server binary

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use call_agent_config::load_settings;
use call_agent_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let env = std::env::var("CALL_AGENT_ENV").ok();
    let settings = load_settings(env.as_deref()).context("failed to load configuration")?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    // Fails fast on a broken tool catalog or unusable backend config
    let state = AppState::new(settings).context("failed to build application state")?;

    let cleanup_shutdown = state.sessions.start_cleanup_task();

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("call agent listening on {}", addr);

    axum::serve(listener, router).await.context("server error")?;

    let _ = cleanup_shutdown.send(true);
    Ok(())
}
