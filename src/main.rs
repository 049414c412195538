//! parkpulse - theme park wait time sync engine
//!
//! Polls a themeparks.wiki-shaped API on a fixed cadence, merges live wait
//! times into an in-memory entity hierarchy, persists snapshots to disk, and
//! serves non-blocking queries from the last good state.
//!
//! Module structure:
//! - `domain/` - Core entity types (Destination, Park, Attraction, Snapshot)
//! - `io/` - External interfaces (HTTP transport, wire decoding, snapshot cache)
//! - `services/` - Engine logic (EntityStore, SyncScheduler, QueryFacade)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use parkpulse::domain::EntityId;
use parkpulse::infra::{Config, Metrics};
use parkpulse::io::cache::SnapshotCache;
use parkpulse::io::transport::{HttpTransport, Transport};
use parkpulse::services::{EntityStore, QueryFacade, SyncScheduler};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// parkpulse - theme park wait time sync engine
#[derive(Parser, Debug)]
#[command(name = "parkpulse", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("parkpulse starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        base_url = %config.base_url(),
        refresh_secs = %config.refresh_interval().as_secs(),
        tracked_parks = %config.tracked_parks().len(),
        cache_file = %config.cache_file(),
        "config_loaded"
    );

    // Warm start from the cache when a readable snapshot exists; any cache
    // problem means a cold start, never a refusal to run
    let cache = SnapshotCache::new(config.cache_file());
    let store = match cache.load() {
        Ok(snapshot) => {
            info!(
                parks = snapshot.parks.len(),
                attractions = snapshot.attractions.len(),
                "warm_start_from_cache"
            );
            Arc::new(EntityStore::from_snapshot(snapshot))
        }
        Err(e) => {
            warn!(error = %e, "cache_unavailable_cold_start");
            Arc::new(EntityStore::new())
        }
    };

    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(config.base_url(), config.request_timeout())?);
    let metrics = Arc::new(Metrics::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = SyncScheduler::new(
        transport,
        Arc::clone(&store),
        cache,
        config.clone(),
        Arc::clone(&metrics),
    );

    // Merge-notification consumer: log the default park's featured waits
    // after every successful sync
    let facade = QueryFacade::new(Arc::clone(&store), &config);
    let default_park = EntityId::from(config.default_park());
    let mut updates = scheduler.subscribe();
    let mut notify_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let generation = *updates.borrow_and_update();
                    log_featured(&facade, &default_park, generation);
                }
                _ = notify_shutdown.changed() => {
                    if *notify_shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    });

    // Periodic metrics summary (lock-free reads)
    let metrics_clone = Arc::clone(&metrics);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run the sync loop until shutdown
    scheduler.run(shutdown_rx).await;

    metrics.report().log();
    info!("parkpulse shutdown complete");
    Ok(())
}

fn log_featured(facade: &QueryFacade, default_park: &EntityId, generation: u64) {
    match facade.park(default_park) {
        Ok(view) => info!(
            generation,
            park = %view.name,
            stale = view.is_stale,
            attractions = view.attractions.len(),
            "park_synced"
        ),
        Err(e) => warn!(generation, error = %e, "default_park_missing"),
    }

    for attraction in facade.featured() {
        info!(
            name = %attraction.name,
            status = attraction.status.as_str(),
            wait_minutes = attraction.wait_minutes,
            stale = attraction.is_stale,
            "featured_wait"
        );
    }
}
