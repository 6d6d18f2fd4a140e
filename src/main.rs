use std::sync::Arc;

use shopify_toc::server::{router, AppState};
use shopify_toc::store::SqliteStore;
use shopify_toc::AppConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::from_env()?);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        app_url = %config.app_url().as_ref(),
        scopes = %config.scopes(),
        api_version = %config.api_version(),
        database_url = %config.database_url(),
        "starting"
    );
    if let Some(origin) = config.admin_origin() {
        warn!(origin = %origin.as_ref(), "admin requests are routed to an override origin");
    }

    let store = Arc::new(SqliteStore::connect(config.database_url()).await?);
    let app = router(AppState::new(config.clone(), store)?);

    let addr = format!("0.0.0.0:{}", config.port());
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
