use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use ocilogs::{Datasource, DatasourceConfig, RawSettings};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::{health, list_resource, query, AppState};
use crate::middleware::normalize_content_type;

/// Routes of the HTTP shell over a ready datasource.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/resources/:resource", get(list_resource))
        .with_state(state)
        .layer(middleware::from_fn(normalize_content_type))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive().max_age(std::time::Duration::from_secs(86400)))
}

/// Load the settings blob, resolve every tenancy and serve until shutdown.
pub async fn serve(settings_path: &Path, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = RawSettings::load(settings_path)?;
    let config = DatasourceConfig::from_env();
    tracing::info!(
        settings = %settings_path.display(),
        environment = %settings.environment(),
        tenancy_mode = %settings.tenancy_mode(),
        cache_max_cost = config.cache_max_cost,
        refresh_secs = config.refresh_interval.as_secs(),
        "Configuration loaded"
    );

    let datasource = Arc::new(Datasource::new(&settings, config).await?);
    let app = router(Arc::new(AppState { datasource }));

    tracing::info!("Starting ocilogs server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
