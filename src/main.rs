use std::sync::Arc;

use auction_core::{
    config::Config,
    engine::{
        AlwaysAuthorized,
        BidEngine,
    },
    handlers,
    metrics,
    scheduler::LifecycleScheduler,
    store::PgAuctionStore,
    telemetry,
};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;
use tracing::{
    error,
    info,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config_path = std::env::var("AUCTION_CORE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config from {config_path}, falling back to defaults: {e}");
            Config::default()
        }
    };

    telemetry::init(&config.telemetry);
    if let Err(e) = metrics::install(&config.telemetry.metrics_bind_addr) {
        error!(error = %e, "failed to install metrics exporter, continuing without it");
    }

    info!(version = auction_core::VERSION, "starting vehicle-auction-core");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    let store = Arc::new(PgAuctionStore::new(pool));
    store.migrate().await?;
    let store: Arc<dyn auction_core::AuctionStore> = store;

    let broadcaster = Arc::new(auction_core::broadcast::EventBroadcaster::new(
        config.auction.broadcaster_buffer,
    ));

    // AlwaysAuthorized is a placeholder for the verified-identity +
    // payment-method service spec.md §1 places outside this core. Swap in a
    // BidAuthorizer backed by that service before this binary takes real
    // traffic.
    let engine = Arc::new(BidEngine::new(
        store.clone(),
        broadcaster.clone(),
        Arc::new(AlwaysAuthorized),
        config.auction.clone(),
    ));

    let scheduler = Arc::new(LifecycleScheduler::new(
        store.clone(),
        broadcaster.clone(),
        config.auction.scheduler_tick,
        100,
    ));

    let scheduler_handle = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run().await })
    };

    let app = handlers::router(handlers::AppState {
        store,
        engine,
        broadcaster: broadcaster.clone(),
        bid_submit_timeout: config.auction.bid_submit_timeout,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "listening");

    let (shutdown_tx, _rx) = broadcast::channel::<()>(1);
    let mut shutdown_rx = shutdown_tx.subscribe();

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
    });

    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                error!(error = %e, "server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    }

    scheduler_handle.abort();
    broadcaster.shutdown();

    Ok(())
}
