//! HTTP server implementation

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::handlers::{
    delete_key, empty_key, get_key, list_keys, put_key, stats_handler, AppState,
};
use crate::config::Config;

/// Build the application router
///
/// Methods other than GET, PUT and DELETE on `/key/*` are answered with
/// 405 by the method router. Request bodies are not size limited.
pub fn router(store: AppState, cors: bool) -> Router {
    let app = Router::new()
        .route("/", get(list_keys))
        .route("/key/", any(empty_key))
        .route("/key/*key", get(get_key).put(put_key).delete(delete_key))
        .route("/stats", get(stats_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http());

    let app = if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.with_state(store)
}

/// Run the web server until Ctrl-C
pub async fn run(config: &Config, store: AppState) -> anyhow::Result<()> {
    let app = router(store.clone(), config.cors);

    let listener = TcpListener::bind(config.addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stats = store.stats();
    info!(
        "Server stopped with {} keys ({} bytes) across {} shards",
        stats.keys, stats.used_memory_bytes, stats.shards
    );

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
