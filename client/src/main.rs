//! Roster Client - command-line sync against the school's record service.
//!
//! Loads the local cache, probes the service, runs one full sync and prints
//! how many records each collection now holds. With the service unreachable
//! it reports the cached state instead.

use roster_client::{Config, HttpRemote};
use roster_engine::{Collection, EngineEvent, FileKv, SyncEngine, SyncOutcome};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_client=info,roster_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let remote = HttpRemote::new(config.api_url.clone(), config.api_key.clone(), config.timeout)?;
    let store = FileKv::new(config.cache_dir.clone());

    tracing::info!("Using record service at {}", remote.url());
    tracing::info!("Cache directory: {}", store.dir().display());

    let engine = SyncEngine::builder(Arc::new(remote), Arc::new(store))
        .config(config.engine_config())
        .build();

    engine.subscribe(|event| {
        if let EngineEvent::Status(status) = event {
            tracing::debug!(
                online = status.is_online,
                syncing = status.is_syncing,
                "status changed"
            );
        }
    });

    match engine.start().await? {
        SyncOutcome::Completed { at, records } => {
            tracing::info!("Synced {} records at {}", records, at.to_rfc3339());
        }
        SyncOutcome::Offline => {
            tracing::warn!("Record service unreachable, showing cached data");
        }
        SyncOutcome::AlreadyRunning => {}
        SyncOutcome::Failed => {
            tracing::error!("Sync failed, showing cached data");
        }
    }

    let data = engine.data();
    for collection in Collection::ALL {
        println!("{:<20} {:>6}", collection.as_str(), data.records(collection).len());
    }
    match engine.last_synced() {
        Some(at) => println!("last synced: {}", at.to_rfc3339()),
        None => println!("last synced: never"),
    }

    Ok(())
}
