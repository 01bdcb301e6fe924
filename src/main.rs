use std::env;
use tracker_hub::config::Config;
use tracker_hub::db::Db;
use tracker_hub::state::AppState;
use tracker_hub::store::DeviceStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    });

    if let Some(dir) = config.db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("FATAL: could not create data directory: {e}");
            std::process::exit(1);
        }
    }
    let db = Db::open(&config.db_path).unwrap_or_else(|e| {
        eprintln!("FATAL: failed to open DB: {e}");
        std::process::exit(1);
    });
    db.integrity_check().unwrap_or_else(|e| {
        eprintln!("FATAL: integrity_check failed: {e}");
        std::process::exit(1);
    });
    info!(path = %config.db_path.display(), "database ready");

    let state = AppState::new(DeviceStore::new(db), config.relay.clone());
    let router = tracker_hub::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %config.bind_addr, relay = %config.relay.addr, "tracker-hub listening");
    axum::serve(listener, router).await.expect("server error");
}
