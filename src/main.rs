use clap::Parser;
use ferrokv::{web, Config, KvStore};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("FerroKV starting...");
    match serde_json::to_string(&config) {
        Ok(json) => info!("Configuration: {}", json),
        Err(e) => error!("Failed to serialize configuration: {}", e),
    }

    let store = Arc::new(KvStore::with_shards(config.shards as usize));
    info!("Store created with {} shards", store.num_shards());

    if let Err(e) = web::run(&config, store).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}
