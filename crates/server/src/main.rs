//! Huddle server entry point.
//!
//! Loads configuration, connects to Postgres and Redis, runs migrations,
//! wires the services and runs the ranking scheduler until SIGINT or SIGTERM.

use std::sync::Arc;

use fred::prelude::{Client, ClientLike};
use huddle_common::{Config, RedisCache, SharedCache};
use huddle_core::AppServices;
use huddle_queue::{SchedulerConfig, run_scheduler};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("huddle=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_redis(config: &Config) -> Result<Arc<Client>, Box<dyn std::error::Error>> {
    let redis_config = fred::types::config::Config::from_url(&config.redis.url)?;
    let client = Client::new(redis_config, None, None, None);
    client.init().await?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_tracing(config.logging.json);

    info!("Starting huddle server...");

    let db = huddle_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    huddle_db::migrate(&db).await?;
    info!("Migrations completed");

    info!("Connecting to Redis...");
    let redis = connect_redis(&config).await?;
    let cache: SharedCache = Arc::new(RedisCache::new(redis.clone(), config.redis.prefix.clone()));
    info!("Connected to Redis");

    let services = AppServices::new(db.clone(), cache, config.ranking.clone());

    let scheduler = run_scheduler(
        SchedulerConfig::from(&config.scheduler),
        Arc::new(services.ranking.clone()),
    );
    info!(jobs = scheduler.len(), "Scheduler running");

    shutdown_signal().await;

    for handle in scheduler {
        handle.abort();
    }
    if let Err(e) = redis.quit().await {
        warn!(error = %e, "Failed to close Redis connection");
    }
    db.close().await?;

    info!("Server shutdown complete");
    Ok(())
}
