mod api;
mod config;
mod extractor;
mod fetcher;
mod insight;
mod matcher;
mod model;
mod normalizer;
mod refresher;
mod risk;
mod screening;
mod storage;
mod utils;

use api::{AppState, build_router};
use config::{AppConfig, load_config};
use extractor::ExtractorRegistry;
use fetcher::HttpFetcher;
use matcher::NameMatcher;
use risk::{RiskService, load_seed_records};
use screening::Screener;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::SqliteStorage;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration from file
    let config_path = env::var("CIR_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    // Initialize storage (SQLite) with async access (wrapped in a Mutex)
    let storage = match SqliteStorage::new(&config.db_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return;
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&config.upload_dir).await {
        warn!("Failed to create upload dir {}: {}", config.upload_dir, e);
    }

    seed_sources(&storage, &config).await;

    let fetcher = match HttpFetcher::new(&config.fetch) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };
    let screener = Arc::new(Screener::new(
        fetcher,
        ExtractorRegistry::with_defaults(),
        NameMatcher::new(&config.matching),
        storage.clone(),
    ));
    let risk = Arc::new(RiskService::new(storage.clone(), screener.clone()));

    if let Some(path) = &config.risk_records_seed {
        match load_seed_records(path) {
            Ok(records) => match risk.seed_records(&records).await {
                Ok(0) => info!("Risk records already present, seed {} skipped", path),
                Ok(n) => info!("Seeded {} risk records from {}", n, path),
                Err(e) => warn!("Risk record seeding failed: {}", e),
            },
            Err(e) => warn!("Failed to read risk record seed: {}", e),
        }
    }

    // Background refresh of the fact cache; /api/sources/refresh wakes it up
    let refresh_notify = Arc::new(Notify::new());
    refresher::spawn_refresher(
        screener.clone(),
        config.refresh_interval_seconds,
        refresh_notify.clone(),
    );

    let app = build_router(AppState {
        storage,
        screener,
        risk,
        refresh_notify,
        upload_dir: PathBuf::from(&config.upload_dir),
    });

    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_addr, e);
            return;
        }
    };
    info!("🚀 Screening service listening on {}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

/// Registers the sources listed in the config unless one with the same title
/// exists. File paths are relative to the upload dir.
async fn seed_sources(storage: &Arc<Mutex<SqliteStorage>>, config: &AppConfig) {
    let storage = storage.lock().await;
    for source in &config.sources {
        match storage.source_exists_by_title(&source.title) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                warn!("Source lookup failed for '{}': {}", source.title, e);
                continue;
            }
        }
        match storage.add_source(source, Path::new(&config.upload_dir)) {
            Ok(added) => info!("Seeded source {} '{}'", added.id, added.title),
            Err(e) => warn!("Skipping configured source '{}': {}", source.title, e),
        }
    }
}
