use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::handlers::location_sink::LocationSink;
use crate::handlers::location_source::LocationEvent;
use crate::handlers::queue::{DurableQueue, FlushOutcome};
use crate::models::error::Result;
use crate::storage::KeyValueStore;

pub const LOCATION_TASK: &str = "background-location-task";

/// Background task body: every event is enqueued and then flushed before the
/// next one is taken, so the queue only ever has one writer.
pub struct LocationTask<S: KeyValueStore, K: LocationSink> {
    queue: DurableQueue<S>,
    sink: K,
    flush_interval: Duration,
}

impl<S: KeyValueStore, K: LocationSink> LocationTask<S, K> {
    pub fn new(queue: DurableQueue<S>, sink: K, flush_interval: Duration) -> Self {
        Self { queue, sink, flush_interval }
    }

    pub fn queue(&self) -> &DurableQueue<S> {
        &self.queue
    }

    pub async fn handle_event(&self, event: LocationEvent) -> Result<FlushOutcome> {
        let points = match event {
            Ok(points) => points,
            Err(e) => {
                warn!("location task received error: {}", e);
                return Ok(FlushOutcome::Empty);
            }
        };
        self.queue.enqueue(&points).await?;
        self.queue.flush(&self.sink).await
    }

    /// Runs until the source side of `rx` closes. Storage errors end the task.
    ///
    /// The timer flushes whatever a previous run left behind right away, then
    /// every `flush_interval`.
    pub async fn run_actor(self, mut rx: mpsc::Receiver<LocationEvent>) -> Result<()> {
        // interval() panics on a zero period
        let mut ticker = tokio::time::interval(self.flush_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let result = select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => self.queue.flush(&self.sink).await,
            };

            if let Err(e) = result {
                error!("location task stopped: {}", e);
                return Err(e);
            }
        }

        self.queue.flush(&self.sink).await?;
        Ok(())
    }
}
