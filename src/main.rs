//! Background location uploader.
//!
//! Reads fixes as JSON lines on stdin, queues them on disk and flushes them
//! to the backend.
//! ```not_rust
//! echo '{"latitude": 52.23, "longitude": 21.01}' \
//!   | LOCATION_API_URL=http://localhost:3000 cargo run
//! ```

use std::sync::Arc;

use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use location_queue::config::CONFIG;
use location_queue::handlers::identity::tracking_user_id;
use location_queue::handlers::location_sink::HttpLocationSink;
use location_queue::handlers::location_source::JsonLinesSource;
use location_queue::handlers::location_task::{LocationTask, LOCATION_TASK};
use location_queue::handlers::queue::DurableQueue;
use location_queue::handlers::tracking::{start_background_updates, StartOutcome, TASKS};
use location_queue::models::error::Result;
use location_queue::storage::{FileStore, KeyValueStore, MemoryStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "location_queue=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let store: Arc<dyn KeyValueStore> = match &CONFIG.queue_dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };

    let user_id = tracking_user_id(store.as_ref()).await?;
    info!("tracking as {}, sending to {}", user_id, CONFIG.api_url);

    let sink = HttpLocationSink::new(&CONFIG.api_url, CONFIG.http_timeout)?;
    let task = LocationTask::new(
        DurableQueue::new(store.clone()),
        sink,
        CONFIG.tracking.deferred_updates_interval,
    );
    let source = JsonLinesSource::new(BufReader::new(tokio::io::stdin()));

    let handle = match start_background_updates(
        TASKS.clone(),
        &CONFIG.permissions,
        source,
        task,
        CONFIG.tracking.clone(),
    ).await? {
        StartOutcome::Started(handle) => handle,
        StartOutcome::AlreadyStarted => return Ok(()),
    };
    info!("registered {} with {:?}", handle.task_name(), TASKS.options(LOCATION_TASK));

    tokio::select! {
        result = handle.wait() => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted, pending points stay queued"),
    }

    let left = DurableQueue::new(store).len().await?;
    info!("{} points left in queue", left);
    Ok(())
}
