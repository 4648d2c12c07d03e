use tracing::{debug, info, warn};

use crate::handlers::location_sink::LocationSink;
use crate::models::error::{QueueError, Result};
use crate::models::location_point::LocationPoint;
use crate::storage::KeyValueStore;

pub const QUEUE_KEY: &str = "pending-locations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued, no request was made.
    Empty,
    /// The batch was accepted and the queue cleared.
    Delivered(usize),
    /// Delivery failed; the batch stays queued for the next attempt.
    Retained(usize),
}

/// Pending fixes, persisted as one JSON array under a single key.
///
/// Mutations are read-modify-write and assume a single caller at a time,
/// which the location task guarantees by handling events one by one.
pub struct DurableQueue<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> DurableQueue<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, QUEUE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn enqueue(&self, points: &[LocationPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let mut pending = self.pending().await?;
        pending.extend_from_slice(points);
        let raw = serde_json::to_string(&pending).map_err(|e| QueueError::Storage(e.to_string()))?;
        self.store.set_item(&self.key, &raw).await?;
        debug!(added = points.len(), queued = pending.len(), "enqueued location points");
        Ok(())
    }

    pub async fn pending(&self) -> Result<Vec<LocationPoint>> {
        match self.store.get_item(&self.key).await? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| QueueError::Corrupt {
                key: self.key.clone(),
                message: e.to_string(),
            }),
        }
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.pending().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove_item(&self.key).await
    }

    /// Sends the whole queue as one batch: read, send, clear.
    ///
    /// Delivery errors are swallowed and reported as [`FlushOutcome::Retained`];
    /// storage errors are returned.
    pub async fn flush<K: LocationSink + ?Sized>(&self, sink: &K) -> Result<FlushOutcome> {
        let batch = self.pending().await?;
        if batch.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        match sink.send(&batch).await {
            Ok(()) => {
                self.clear().await?;
                info!(points = batch.len(), "flushed location batch");
                Ok(FlushOutcome::Delivered(batch.len()))
            }
            Err(e) if e.is_retryable() => {
                warn!(points = batch.len(), error = %e, "location batch stays queued");
                Ok(FlushOutcome::Retained(batch.len()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct RecordingSink {
        offline: AtomicBool,
        batches: Mutex<Vec<Vec<LocationPoint>>>,
    }

    #[async_trait]
    impl LocationSink for RecordingSink {
        async fn send(&self, points: &[LocationPoint]) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(QueueError::Network("offline".to_string()));
            }
            self.batches.lock().await.push(points.to_vec());
            Ok(())
        }
    }

    fn points(n: usize) -> Vec<LocationPoint> {
        (0..n).map(|i| LocationPoint::new(50.0 + i as f64 * 0.001, 19.0, i as i64)).collect()
    }

    fn queue() -> DurableQueue<Arc<MemoryStore>> {
        DurableQueue::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn failed_flush_keeps_all_points() {
        let queue = queue();
        let sink = RecordingSink::default();
        sink.offline.store(true, Ordering::SeqCst);

        queue.enqueue(&points(7)).await.unwrap();
        assert_eq!(queue.flush(&sink).await.unwrap(), FlushOutcome::Retained(7));
        assert_eq!(queue.pending().await.unwrap(), points(7));
    }

    #[tokio::test]
    async fn successful_flush_empties_queue() {
        for n in [1, 3, 250] {
            let queue = queue();
            let sink = RecordingSink::default();
            queue.enqueue(&points(n)).await.unwrap();

            assert_eq!(queue.flush(&sink).await.unwrap(), FlushOutcome::Delivered(n));
            assert!(queue.is_empty().await.unwrap());
            assert_eq!(sink.batches.lock().await.len(), 1);
        }
    }

    #[tokio::test]
    async fn batch_preserves_arrival_order() {
        let queue = queue();
        let sink = RecordingSink::default();
        let all = points(5);
        queue.enqueue(&all[..2]).await.unwrap();
        queue.enqueue(&all[2..3]).await.unwrap();
        queue.enqueue(&all[3..]).await.unwrap();

        queue.flush(&sink).await.unwrap();
        assert_eq!(sink.batches.lock().await[0], all);
    }

    #[tokio::test]
    async fn repeated_failures_neither_duplicate_nor_drop() {
        let queue = queue();
        let sink = RecordingSink::default();
        sink.offline.store(true, Ordering::SeqCst);
        let all = points(6);

        queue.enqueue(&all[..3]).await.unwrap();
        for _ in 0..4 {
            queue.flush(&sink).await.unwrap();
        }
        queue.enqueue(&all[3..]).await.unwrap();
        queue.flush(&sink).await.unwrap();
        assert_eq!(queue.pending().await.unwrap(), all);

        sink.offline.store(false, Ordering::SeqCst);
        assert_eq!(queue.flush(&sink).await.unwrap(), FlushOutcome::Delivered(6));
        assert_eq!(sink.batches.lock().await.as_slice(), &[all]);
    }

    #[tokio::test]
    async fn empty_queue_makes_no_request() {
        let queue = queue();
        let sink = RecordingSink::default();
        assert_eq!(queue.flush(&sink).await.unwrap(), FlushOutcome::Empty);

        queue.store().set_item(QUEUE_KEY, "[]").await.unwrap();
        assert_eq!(queue.flush(&sink).await.unwrap(), FlushOutcome::Empty);
        assert!(sink.batches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn enqueue_nothing_does_not_touch_storage() {
        let queue = queue();
        queue.enqueue(&[]).await.unwrap();
        assert_eq!(queue.store().get_item(QUEUE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_blob_is_fatal() {
        let queue = queue();
        queue.store().set_item(QUEUE_KEY, "{not json").await.unwrap();
        let sink = RecordingSink::default();
        assert!(matches!(queue.flush(&sink).await, Err(QueueError::Corrupt { .. })));
    }
}
