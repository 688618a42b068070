//! Entry point tying cache, registry and tasks together.
//!
//! `request` flow: cache hit -> immediate delivery; miss -> new task
//! registered for the slot (cancelling the slot's previous fetch) -> transfer
//! -> decode -> cache store -> delivery if the slot still expects the key.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::domain::entities::{
    Delivery, DeliveryCallback, FetchDescriptor, ItemKey, SlotId, TaskId,
};
use crate::domain::errors::FetchError;
use crate::domain::ports::SlotCurrency;
use crate::infrastructure::cache::{CacheStats, KeyedCache};

use super::fetch_task::{FetchPipeline, FetchTask, TaskOutcome};
use super::task_registry::TaskRegistry;

/// What `request` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Served from cache; the callback already ran.
    Cached,
    /// A fetch task was started.
    Fetching(TaskId),
}

/// Coordinates cached and fetched values for recycled slots.
pub struct FetchCoordinator<V> {
    cache: Arc<KeyedCache<ItemKey, V>>,
    registry: Arc<TaskRegistry>,
    currency: Arc<dyn SlotCurrency>,
    pipeline: Arc<FetchPipeline<V>>,
}

impl<V> std::fmt::Debug for FetchCoordinator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl<V> FetchCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a coordinator with an empty cache.
    #[must_use]
    pub fn new(pipeline: FetchPipeline<V>, currency: Arc<dyn SlotCurrency>) -> Self {
        Self::with_cache(pipeline, currency, Arc::new(KeyedCache::new()))
    }

    /// Creates a coordinator backed by an existing cache.
    #[must_use]
    pub fn with_cache(
        pipeline: FetchPipeline<V>,
        currency: Arc<dyn SlotCurrency>,
        cache: Arc<KeyedCache<ItemKey, V>>,
    ) -> Self {
        Self {
            cache,
            registry: Arc::new(TaskRegistry::new()),
            currency,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Requests the value for `key` on behalf of `slot`.
    ///
    /// Never blocks. On a cache hit `callback` runs before this returns.
    /// Otherwise it runs once the fetch ends, from a runtime worker:
    /// - success: only if the slot still expects `key`;
    /// - failure: always, with the error;
    /// - cancellation: always, with [`FetchError::Cancelled`].
    ///
    /// Callers must hop to their presentation context before touching slot
    /// state. Must be called from within a Tokio runtime.
    pub fn request(
        &self,
        key: ItemKey,
        descriptor: FetchDescriptor,
        slot: SlotId,
        callback: DeliveryCallback<V>,
    ) -> RequestStatus {
        if let Some(value) = self.cache.lookup(&key) {
            // The slot moved on to a cached item: its older fetch is stale.
            self.registry.clear(slot);
            trace!(key = %key, slot = %slot, "Serving from cache");
            callback(Delivery::new(slot, key, Ok(value)));
            return RequestStatus::Cached;
        }

        let task = Arc::new(FetchTask::new(key, descriptor));
        let task_id = task.id();
        self.registry.register(slot, Arc::clone(&task));

        let cache = Arc::clone(&self.cache);
        let registry = Arc::clone(&self.registry);
        let currency = Arc::clone(&self.currency);
        let finished = Arc::clone(&task);

        task.start(&self.pipeline, move |outcome| {
            let result = match outcome {
                TaskOutcome::Completed(value) => {
                    cache.store(key, value.clone());
                    if currency.expects(slot, key) {
                        Some(Ok(value))
                    } else {
                        debug!(key = %key, slot = %slot, "Slot moved on, dropping result");
                        None
                    }
                }
                TaskOutcome::Failed(e) => Some(Err(e)),
                TaskOutcome::Cancelled => Some(Err(FetchError::Cancelled)),
            };

            if let Some(result) = result {
                callback(Delivery::new(slot, key, result));
            }

            // After the callback, so an empty registry means nothing is left to deliver.
            registry.on_terminal(slot, &finished);
        });

        RequestStatus::Fetching(task_id)
    }

    /// Cancels the slot's in-flight fetch, if any.
    ///
    /// Called when a slot is about to be reused or hidden. Returns true if a
    /// fetch was cancelled.
    pub fn cancel_for_slot(&self, slot: SlotId) -> bool {
        self.registry.clear(slot)
    }

    /// Cancels every in-flight fetch.
    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Number of slots with an in-flight fetch.
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if `slot` has an in-flight fetch.
    pub fn is_loading(&self, slot: SlotId) -> bool {
        self.registry.active(slot).is_some()
    }

    /// The shared value cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<KeyedCache<ItemKey, V>> {
        &self.cache
    }

    /// Returns cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{MockSlotCurrency, MockTransport};
    use crate::infrastructure::decode::RawBytesDecoder;
    use crate::presentation::SlotTable;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::{Semaphore, mpsc};

    type Rx = mpsc::UnboundedReceiver<Delivery<Bytes>>;

    fn url(n: u64) -> String {
        format!("https://example.com/{n}.jpg")
    }

    fn always_current() -> Arc<MockSlotCurrency> {
        let mut currency = MockSlotCurrency::new();
        currency.expect_expects().returning(|_, _| true);
        Arc::new(currency)
    }

    fn coordinator(
        transport: Arc<MockTransport>,
        currency: Arc<dyn SlotCurrency>,
    ) -> FetchCoordinator<Bytes> {
        let pipeline = FetchPipeline::new(transport, Arc::new(RawBytesDecoder), 4, true);
        FetchCoordinator::new(pipeline, currency)
    }

    fn channel() -> (DeliveryCallback<Bytes>, Rx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: DeliveryCallback<Bytes> = Box::new(move |delivery| {
            let _ = tx.send(delivery);
        });
        (callback, rx)
    }

    async fn next(rx: &mut Rx) -> Option<Delivery<Bytes>> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no delivery within timeout")
    }

    #[tokio::test]
    async fn test_miss_fetches_stores_and_delivers() {
        let transport = Arc::new(MockTransport::new().with_response(&url(42), "img-42"));
        let coordinator = coordinator(transport.clone(), always_current());
        let (cb, mut rx) = channel();

        let status = coordinator.request(
            ItemKey(42),
            FetchDescriptor::new(url(42)),
            SlotId(7),
            cb,
        );
        assert!(matches!(status, RequestStatus::Fetching(_)));

        let delivery = next(&mut rx).await.unwrap();
        assert_eq!((delivery.slot, delivery.key), (SlotId(7), ItemKey(42)));
        assert_eq!(&delivery.result.unwrap()[..], b"img-42");
        assert_eq!(
            coordinator.cache().peek(&ItemKey(42)),
            Some(Bytes::from_static(b"img-42"))
        );
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_second_request_for_slot_cancels_first() {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Arc::new(
            MockTransport::new()
                .with_response(&url(1), "first")
                .with_response(&url(2), "second")
                .with_gate(gate.clone()),
        );
        let coordinator = coordinator(transport, always_current());
        let (cb1, mut rx1) = channel();
        let (cb2, mut rx2) = channel();

        coordinator.request(ItemKey(42), FetchDescriptor::new(url(1)), SlotId(7), cb1);
        coordinator.request(ItemKey(42), FetchDescriptor::new(url(2)), SlotId(7), cb2);
        gate.add_permits(2);

        let first = next(&mut rx1).await.unwrap();
        assert!(first.is_cancelled());

        let second = next(&mut rx2).await.unwrap();
        assert_eq!(&second.result.unwrap()[..], b"second");
        assert_eq!(
            coordinator.cache().peek(&ItemKey(42)),
            Some(Bytes::from_static(b"second"))
        );
    }

    #[tokio::test]
    async fn test_cache_hit_is_synchronous() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = coordinator(transport.clone(), always_current());
        coordinator
            .cache()
            .store(ItemKey(5), Bytes::from_static(b"X"));
        let (cb, mut rx) = channel();

        let status = coordinator.request(
            ItemKey(5),
            FetchDescriptor::new("anything"),
            SlotId(1),
            cb,
        );

        assert_eq!(status, RequestStatus::Cached);
        let delivery = rx.try_recv().expect("delivered before request returned");
        assert_eq!(&delivery.result.unwrap()[..], b"X");
        assert_eq!(transport.calls(), 0);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_cancels_slot_previous_fetch() {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Arc::new(MockTransport::new().with_gate(gate));
        let coordinator = coordinator(transport, always_current());
        coordinator.cache().store(ItemKey(5), Bytes::from_static(b"X"));
        let (cb1, mut rx1) = channel();
        let (cb2, _rx2) = channel();

        coordinator.request(ItemKey(1), FetchDescriptor::new(url(1)), SlotId(1), cb1);
        coordinator.request(ItemKey(5), FetchDescriptor::new(url(5)), SlotId(1), cb2);

        assert!(next(&mut rx1).await.unwrap().is_cancelled());
        assert!(!coordinator.is_loading(SlotId(1)));
    }

    #[tokio::test]
    async fn test_malformed_url_reports_invalid_request() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = coordinator(transport.clone(), always_current());
        let (cb, mut rx) = channel();

        coordinator.request(
            ItemKey(9),
            FetchDescriptor::new("ht!tp://broken url"),
            SlotId(2),
            cb,
        );

        let delivery = rx.try_recv().expect("invalid request fails fast");
        assert!(matches!(
            delivery.result,
            Err(FetchError::InvalidRequest { .. })
        ));
        assert!(coordinator.cache().is_empty());
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_for_unknown_slot_is_noop() {
        let coordinator = coordinator(Arc::new(MockTransport::new()), always_current());
        assert!(!coordinator.cancel_for_slot(SlotId(3)));
    }

    #[tokio::test]
    async fn test_cancel_for_slot_prevents_delivery() {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Arc::new(
            MockTransport::new()
                .with_response(&url(1), "late")
                .with_gate(gate.clone()),
        );
        let coordinator = coordinator(transport.clone(), always_current());
        let (cb, mut rx) = channel();

        coordinator.request(ItemKey(1), FetchDescriptor::new(url(1)), SlotId(3), cb);
        assert!(coordinator.cancel_for_slot(SlotId(3)));
        gate.add_permits(1);

        assert!(next(&mut rx).await.unwrap().is_cancelled());
        assert!(coordinator.cache().is_empty());
        assert_eq!(transport.finished(), 0);
    }

    #[tokio::test]
    async fn test_stale_slot_gets_no_success() {
        let transport = Arc::new(MockTransport::new().with_response(&url(1), "img"));
        let mut currency = MockSlotCurrency::new();
        currency
            .expect_expects()
            .withf(|slot, key| *slot == SlotId(4) && *key == ItemKey(1))
            .times(1)
            .returning(|_, _| false);
        let coordinator = coordinator(transport, Arc::new(currency));
        let (cb, mut rx) = channel();

        coordinator.request(ItemKey(1), FetchDescriptor::new(url(1)), SlotId(4), cb);

        assert!(next(&mut rx).await.is_none());
        assert!(coordinator.cache().contains(&ItemKey(1)));
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched_and_retries() {
        let transport = Arc::new(MockTransport::new().with_response(&url(2), "ok"));
        let coordinator = coordinator(transport.clone(), always_current());

        let (cb, mut rx) = channel();
        coordinator.request(ItemKey(8), FetchDescriptor::new(url(1)), SlotId(1), cb);
        let failed = next(&mut rx).await.unwrap();
        assert!(matches!(failed.result, Err(FetchError::Transfer { .. })));
        assert!(coordinator.cache().is_empty());

        let (cb, mut rx) = channel();
        coordinator.request(ItemKey(8), FetchDescriptor::new(url(2)), SlotId(1), cb);
        assert!(next(&mut rx).await.unwrap().result.is_ok());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_same_key_from_two_slots_caches_once() {
        let transport = Arc::new(MockTransport::new().with_response(&url(42), "img"));
        let coordinator = coordinator(transport.clone(), always_current());
        let (cb1, mut rx1) = channel();
        let (cb2, mut rx2) = channel();

        coordinator.request(ItemKey(42), FetchDescriptor::new(url(42)), SlotId(1), cb1);
        coordinator.request(ItemKey(42), FetchDescriptor::new(url(42)), SlotId(2), cb2);

        assert!(next(&mut rx1).await.unwrap().result.is_ok());
        assert!(next(&mut rx2).await.unwrap().result.is_ok());
        assert_eq!(coordinator.cache().len(), 1);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rapid_reassignment_settles_on_last_item() {
        const SLOTS: u64 = 8;
        const ROUNDS: u64 = 25;

        let mut transport = MockTransport::new();
        for key in 0..SLOTS * ROUNDS {
            transport = transport.with_response(&url(key), key.to_string());
        }
        let slots = Arc::new(SlotTable::new());
        let coordinator = coordinator(Arc::new(transport), slots.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        for round in 0..ROUNDS {
            for slot in 0..SLOTS {
                let key = ItemKey(round * SLOTS + slot);
                slots.assign(SlotId(slot), key);
                let tx = tx.clone();
                coordinator.request(
                    key,
                    FetchDescriptor::new(url(key.0)),
                    SlotId(slot),
                    Box::new(move |d| {
                        let _ = tx.send(d);
                    }),
                );
            }
        }
        drop(tx);

        let mut delivered = std::collections::HashSet::new();
        while let Some(delivery) = next(&mut rx).await {
            if let Ok(bytes) = &delivery.result {
                assert_eq!(bytes, &Bytes::from(delivery.key.0.to_string()));
                delivered.insert((delivery.slot, delivery.key));
            }
        }

        for slot in 0..SLOTS {
            let last = ItemKey((ROUNDS - 1) * SLOTS + slot);
            assert!(delivered.contains(&(SlotId(slot), last)), "{slot} missed {last}");
        }
        assert_eq!(coordinator.pending_count(), 0);
    }
}
