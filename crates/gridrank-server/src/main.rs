mod api;
mod middleware;

use std::time::Duration;

use gridrank_engine::{CancellationToken, RankingService};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = gridrank_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let service = match RankingService::from_app_config(&config, None) {
        Ok(service) => Some(service),
        Err(e) => {
            tracing::warn!(error = %e, "ranking endpoints disabled: provider not configured");
            None
        }
    };

    let shutdown = CancellationToken::new();
    let auth = AuthState::from_env(matches!(
        config.env,
        gridrank_core::Environment::Development
    ))?;
    let state = AppState {
        service,
        shutdown: shutdown.clone(),
        default_max_wait: Duration::from_secs(config.max_wait_secs),
        default_poll_interval: Duration::from_secs(config.poll_interval_secs),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "gridrank server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM and cancels in-flight polls.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, cancelling in-flight grid checks");
    shutdown.cancel();
}
