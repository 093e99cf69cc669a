use std::{net::SocketAddr, sync::Arc, time::Duration};

use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biashara_hub::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    jobs::spawn_confirmation_worker,
    routes::create_app,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,biashara_hub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    // One token refills every window/limit seconds; the burst allows a full window at once.
    let limit = config.rate_limit_per_window.max(1);
    let refill_secs = (config.rate_limit_window_secs / u64::from(limit)).max(1);
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(refill_secs)
            .burst_size(limit)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let environment = config.environment;
    let state = AppState::new(pool, config);

    let worker = spawn_confirmation_worker(state.clone(), Duration::from_millis(500));
    let app = create_app(state).layer(GovernorLayer::new(governor_config));

    tracing::info!(%addr, environment = environment.as_str(), "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    worker.abort();
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
